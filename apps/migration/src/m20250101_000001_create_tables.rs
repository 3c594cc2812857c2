use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::AvatarUrl).string())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null().default("user"))
                    .col(&mut timestamp(Users::CreatedAt))
                    .col(&mut timestamp(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OAuthAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(OAuthAccounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(OAuthAccounts::UserId).uuid().not_null())
                    .col(ColumnDef::new(OAuthAccounts::Provider).string_len(32).not_null())
                    .col(ColumnDef::new(OAuthAccounts::ProviderUserId).string().not_null())
                    .col(ColumnDef::new(OAuthAccounts::AccessToken).text().not_null())
                    .col(ColumnDef::new(OAuthAccounts::RefreshToken).text())
                    .col(ColumnDef::new(OAuthAccounts::ExpiresAt).timestamp_with_time_zone())
                    .col(&mut timestamp(OAuthAccounts::CreatedAt))
                    .col(&mut timestamp(OAuthAccounts::UpdatedAt))
                    .foreign_key(&mut cascade("fk_oauth_accounts_user", OAuthAccounts::Table, OAuthAccounts::UserId, Users::Table, Users::Id))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_accounts_provider_user")
                    .table(OAuthAccounts::Table)
                    .col(OAuthAccounts::Provider)
                    .col(OAuthAccounts::ProviderUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Sessions::Token).string_len(128).not_null().unique_key())
                    .col(ColumnDef::new(Sessions::ExpiresAt).timestamp_with_time_zone().not_null())
                    .col(&mut timestamp(Sessions::CreatedAt))
                    .foreign_key(&mut cascade("fk_sessions_user", Sessions::Table, Sessions::UserId, Users::Table, Users::Id))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_expires_at")
                    .table(Sessions::Table)
                    .col(Sessions::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Posts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Posts::AuthorId).uuid().not_null())
                    .col(ColumnDef::new(Posts::Title).string().not_null())
                    .col(ColumnDef::new(Posts::Slug).string().not_null().unique_key())
                    .col(ColumnDef::new(Posts::Content).text().not_null())
                    .col(ColumnDef::new(Posts::Preview).text().not_null().default(""))
                    .col(ColumnDef::new(Posts::CoverImage).string())
                    .col(ColumnDef::new(Posts::Published).boolean().not_null().default(false))
                    .col(ColumnDef::new(Posts::PublishedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Posts::ReadTimeMinutes).integer().not_null().default(1))
                    .col(&mut timestamp(Posts::CreatedAt))
                    .col(&mut timestamp(Posts::UpdatedAt))
                    .foreign_key(&mut cascade("fk_posts_author", Posts::Table, Posts::AuthorId, Users::Table, Users::Id))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_published_created")
                    .table(Posts::Table)
                    .col(Posts::Published)
                    .col(Posts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Comments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Comments::PostId).uuid().not_null())
                    .col(ColumnDef::new(Comments::UserId).uuid().not_null())
                    .col(ColumnDef::new(Comments::ParentId).uuid())
                    .col(ColumnDef::new(Comments::Content).text().not_null())
                    .col(&mut timestamp(Comments::CreatedAt))
                    .col(&mut timestamp(Comments::UpdatedAt))
                    .col(ColumnDef::new(Comments::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(&mut cascade("fk_comments_post", Comments::Table, Comments::PostId, Posts::Table, Posts::Id))
                    .foreign_key(&mut cascade("fk_comments_user", Comments::Table, Comments::UserId, Users::Table, Users::Id))
                    .foreign_key(&mut cascade("fk_comments_parent", Comments::Table, Comments::ParentId, Comments::Table, Comments::Id))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_post_created")
                    .table(Comments::Table)
                    .col(Comments::PostId)
                    .col(Comments::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostLikes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PostLikes::UserId).uuid().not_null())
                    .col(ColumnDef::new(PostLikes::PostId).uuid().not_null())
                    .col(&mut timestamp(PostLikes::CreatedAt))
                    .primary_key(Index::create().col(PostLikes::UserId).col(PostLikes::PostId))
                    .foreign_key(&mut cascade("fk_post_likes_user", PostLikes::Table, PostLikes::UserId, Users::Table, Users::Id))
                    .foreign_key(&mut cascade("fk_post_likes_post", PostLikes::Table, PostLikes::PostId, Posts::Table, Posts::Id))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommentLikes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CommentLikes::UserId).uuid().not_null())
                    .col(ColumnDef::new(CommentLikes::CommentId).uuid().not_null())
                    .col(&mut timestamp(CommentLikes::CreatedAt))
                    .primary_key(Index::create().col(CommentLikes::UserId).col(CommentLikes::CommentId))
                    .foreign_key(&mut cascade("fk_comment_likes_user", CommentLikes::Table, CommentLikes::UserId, Users::Table, Users::Id))
                    .foreign_key(&mut cascade("fk_comment_likes_comment", CommentLikes::Table, CommentLikes::CommentId, Comments::Table, Comments::Id))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profile::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profile::Name).string().not_null())
                    .col(ColumnDef::new(Profile::Description).text().not_null().default(""))
                    .col(ColumnDef::new(Profile::PhotoUrl).string())
                    .col(ColumnDef::new(Profile::Activity).text().not_null().default(""))
                    .col(ColumnDef::new(Profile::ContactEmail).string())
                    .col(ColumnDef::new(Profile::ContactGithub).string())
                    .col(ColumnDef::new(Profile::ContactLinkedin).string())
                    .col(ColumnDef::new(Profile::ContactVk).string())
                    .col(&mut timestamp(Profile::CreatedAt))
                    .col(&mut timestamp(Profile::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MediaFiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MediaFiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(MediaFiles::UploaderId).uuid().not_null())
                    .col(ColumnDef::new(MediaFiles::Filename).string().not_null().unique_key())
                    .col(ColumnDef::new(MediaFiles::OriginalName).string().not_null())
                    .col(ColumnDef::new(MediaFiles::MimeType).string_len(64).not_null())
                    .col(ColumnDef::new(MediaFiles::SizeBytes).big_integer().not_null())
                    .col(&mut timestamp(MediaFiles::CreatedAt))
                    .foreign_key(&mut cascade("fk_media_files_uploader", MediaFiles::Table, MediaFiles::UploaderId, Users::Table, Users::Id))
                    .to_owned(),
            )
            .await?;

        // Placeholder profile so the public page renders before the first edit.
        let seed = Query::insert()
            .into_table(Profile::Table)
            .columns([Profile::Id, Profile::Name, Profile::Description, Profile::Activity])
            .values([
                Expr::cust("gen_random_uuid()"),
                "Your Name".into(),
                "".into(),
                "".into(),
            ])
            .map_err(|e| DbErr::Migration(e.to_string()))?
            .to_owned();
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            MediaFiles::Table.into_iden(),
            Profile::Table.into_iden(),
            CommentLikes::Table.into_iden(),
            PostLikes::Table.into_iden(),
            Comments::Table.into_iden(),
            Posts::Table.into_iden(),
            Sessions::Table.into_iden(),
            OAuthAccounts::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

fn cascade<T: IntoIden + 'static, C: IntoIden, R: IntoIden + 'static, RC: IntoIden>(
    name: &str,
    table: T,
    column: C,
    ref_table: R,
    ref_column: RC,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(ref_table, ref_column)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    AvatarUrl,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OAuthAccounts {
    #[sea_orm(iden = "oauth_accounts")]
    Table,
    Id,
    UserId,
    Provider,
    ProviderUserId,
    AccessToken,
    RefreshToken,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    Token,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    AuthorId,
    Title,
    Slug,
    Content,
    Preview,
    CoverImage,
    Published,
    PublishedAt,
    ReadTimeMinutes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    PostId,
    UserId,
    ParentId,
    Content,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum PostLikes {
    Table,
    UserId,
    PostId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CommentLikes {
    Table,
    UserId,
    CommentId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profile {
    Table,
    Id,
    Name,
    Description,
    PhotoUrl,
    Activity,
    ContactEmail,
    ContactGithub,
    ContactLinkedin,
    ContactVk,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MediaFiles {
    Table,
    Id,
    UploaderId,
    Filename,
    OriginalName,
    MimeType,
    SizeBytes,
    CreatedAt,
}
