use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::token_scan::ScanKind;

/// A short-lived credential members present to record check-in or check-out.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    #[sea_orm(unique)]
    pub value: String,
    pub issued_by: i64,
    pub session_type: TokenSessionType,
    pub expires_at: DateTime<Utc>,
    pub max_usage: i32,
    pub usage_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which scan kinds a token accepts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "token_session_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TokenSessionType {
    #[sea_orm(string_value = "check_in")]
    CheckIn,

    #[sea_orm(string_value = "check_out")]
    CheckOut,

    #[sea_orm(string_value = "both")]
    Both,
}

impl TokenSessionType {
    pub fn permits(self, kind: ScanKind) -> bool {
        matches!(
            (self, kind),
            (TokenSessionType::Both, _)
                | (TokenSessionType::CheckIn, ScanKind::CheckIn)
                | (TokenSessionType::CheckOut, ScanKind::CheckOut)
        )
    }

    /// Number of distinct scan kinds the token accepts.
    pub fn kind_count(self) -> i32 {
        match self {
            TokenSessionType::Both => 2,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id"
    )]
    Session,
    #[sea_orm(has_many = "super::token_scan::Entity")]
    Scans,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::token_scan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Scans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Parameters for minting a token.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub session_id: i64,
    pub issued_by: i64,
    pub session_type: TokenSessionType,
    pub expires_at: DateTime<Utc>,
    pub max_usage: i32,
}

impl Model {
    /// 32 random bytes from the OS generator, hex encoded.
    pub fn generate_value() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub async fn create<C: ConnectionTrait>(db: &C, new: NewToken) -> Result<Model, DbErr> {
        let now = Utc::now();

        ActiveModel {
            session_id: Set(new.session_id),
            value: Set(Self::generate_value()),
            issued_by: Set(new.issued_by),
            session_type: Set(new.session_type),
            expires_at: Set(new.expires_at),
            max_usage: Set(new.max_usage),
            usage_count: Set(0),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_count >= self.max_usage
    }

    pub fn is_valid_for_scanning(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now) && !self.is_exhausted()
    }

    pub async fn find_by_value<C: ConnectionTrait>(
        db: &C,
        value: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Value.eq(value))
            .one(db)
            .await
    }

    /// The session's active token, if it has one.
    pub async fn find_active_for_session<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Active.eq(true))
            .one(db)
            .await
    }

    pub async fn deactivate<C: ConnectionTrait>(db: &C, token_id: i64) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Active, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(token_id))
            .filter(Column::Active.eq(true))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn deactivate_for_session<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
    ) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Active, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Active.eq(true))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Flips every active token whose expiry has passed. Returns how many changed.
    pub async fn deactivate_expired<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Active, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Active.eq(true))
            .filter(Column::ExpiresAt.lte(now))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Counts one use against the token if it still has uses left.
    ///
    /// Returns `false` when the limit is already reached.
    pub async fn try_consume<C: ConnectionTrait>(db: &C, token_id: i64) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::UsageCount, Expr::col(Column::UsageCount).add(1))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(token_id))
            .filter(Expr::col(Column::UsageCount).lt(Expr::col(Column::MaxUsage)))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }
}
