use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A directory entry for anyone who can act on the schedule.
///
/// Accounts are owned by the external account service; this table is the
/// read model the scheduling core looks identities up in.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    /// Inactive accounts keep their history but cannot enroll.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UserRole {
    #[sea_orm(string_value = "member")]
    Member,

    #[sea_orm(string_value = "trainer")]
    Trainer,

    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DbConn,
        username: &str,
        email: &str,
        full_name: &str,
        role: UserRole,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email.to_owned()),
            full_name: Set(full_name.to_owned()),
            role: Set(role),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn set_active(db: &DbConn, user_id: i64, active: bool) -> Result<Model, DbErr> {
        let model = Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("User {user_id} not found")))?;

        let mut active_model: ActiveModel = model.into();
        active_model.active = Set(active);
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Trainers and admins may run sessions.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Trainer | UserRole::Admin)
    }
}
