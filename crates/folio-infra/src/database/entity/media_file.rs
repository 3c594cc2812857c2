//! Uploaded media entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use folio_core::domain::MediaFile;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "media_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub uploader_id: Uuid,
    #[sea_orm(unique)]
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploaderId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Uploader,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Uploader.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MediaFile {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            uploader_id: model.uploader_id,
            filename: model.filename,
            original_name: model.original_name,
            mime_type: model.mime_type,
            size_bytes: model.size_bytes,
            created_at: model.created_at.into(),
        }
    }
}

impl From<MediaFile> for ActiveModel {
    fn from(file: MediaFile) -> Self {
        Self {
            id: Set(file.id),
            uploader_id: Set(file.uploader_id),
            filename: Set(file.filename),
            original_name: Set(file.original_name),
            mime_type: Set(file.mime_type),
            size_bytes: Set(file.size_bytes),
            created_at: Set(file.created_at.into()),
        }
    }
}
