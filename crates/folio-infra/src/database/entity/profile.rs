//! Profile entity for SeaORM. The table holds a single row.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use folio_core::domain::{Contacts, Profile};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub photo_url: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub activity: String,
    pub contact_email: Option<String>,
    pub contact_github: Option<String>,
    pub contact_linkedin: Option<String>,
    pub contact_vk: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Profile {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            photo_url: model.photo_url,
            activity: model.activity,
            contacts: Contacts {
                email: model.contact_email,
                github: model.contact_github,
                linkedin: model.contact_linkedin,
                vk: model.contact_vk,
            },
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<Profile> for ActiveModel {
    fn from(profile: Profile) -> Self {
        Self {
            id: Set(profile.id),
            name: Set(profile.name),
            description: Set(profile.description),
            photo_url: Set(profile.photo_url),
            activity: Set(profile.activity),
            contact_email: Set(profile.contacts.email),
            contact_github: Set(profile.contacts.github),
            contact_linkedin: Set(profile.contacts.linkedin),
            contact_vk: Set(profile.contacts.vk),
            created_at: Set(profile.created_at.into()),
            updated_at: Set(profile.updated_at.into()),
        }
    }
}
