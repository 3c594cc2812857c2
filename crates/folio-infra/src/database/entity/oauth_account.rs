//! OAuth account link entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use folio_core::domain::OAuthAccount;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    #[sea_orm(column_type = "Text")]
    pub access_token: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for OAuthAccount {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            provider: model.provider,
            provider_user_id: model.provider_user_id,
            access_token: model.access_token,
            refresh_token: model.refresh_token,
            expires_at: model.expires_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<OAuthAccount> for ActiveModel {
    fn from(account: OAuthAccount) -> Self {
        Self {
            id: Set(account.id),
            user_id: Set(account.user_id),
            provider: Set(account.provider),
            provider_user_id: Set(account.provider_user_id),
            access_token: Set(account.access_token),
            refresh_token: Set(account.refresh_token),
            expires_at: Set(account.expires_at.map(Into::into)),
            created_at: Set(account.created_at.into()),
            updated_at: Set(account.updated_at.into()),
        }
    }
}
