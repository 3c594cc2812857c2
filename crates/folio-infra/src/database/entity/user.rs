//! User entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use folio_core::domain::{Role, User};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
    #[sea_orm(has_many = "super::oauth_account::Entity")]
    OAuthAccount,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::oauth_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OAuthAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to Domain User.
impl From<Model> for User {
    fn from(model: Model) -> Self {
        let role = model.role.parse().unwrap_or_else(|e| {
            tracing::warn!(user_id = %model.id, error = %e, "Unknown role stored, treating as user");
            Role::User
        });
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            avatar_url: model.avatar_url,
            role,
            created_at: model.created_at.into(),
        }
    }
}

/// Conversion from Domain User to SeaORM ActiveModel.
impl From<User> for ActiveModel {
    fn from(user: User) -> Self {
        Self {
            id: Set(user.id),
            email: Set(user.email),
            name: Set(user.name),
            avatar_url: Set(user.avatar_url),
            role: Set(user.role.as_str().to_string()),
            created_at: Set(user.created_at.into()),
        }
    }
}
