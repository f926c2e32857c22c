use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One member's place in one session. Cancelled rows are kept as history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub member_id: i64,
    pub status: EnrollmentStatus,
    /// 1-based waitlist position; `None` unless waitlisted.
    pub position: Option<i32>,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "enrollment_status")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EnrollmentStatus {
    #[sea_orm(string_value = "enrolled")]
    Enrolled,

    #[sea_orm(string_value = "waitlisted")]
    Waitlisted,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::MemberId",
        to = "super::user::Column::Id"
    )]
    Member,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create_enrolled<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        member_id: i64,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            session_id: Set(session_id),
            member_id: Set(member_id),
            status: Set(EnrollmentStatus::Enrolled),
            position: Set(None),
            enrolled_at: Set(Some(now)),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn create_waitlisted<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        member_id: i64,
        position: i32,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            session_id: Set(session_id),
            member_id: Set(member_id),
            status: Set(EnrollmentStatus::Waitlisted),
            position: Set(Some(position)),
            enrolled_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The member's enrolled or waitlisted entry for the session, if any.
    pub async fn find_active<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        member_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::MemberId.eq(member_id))
            .filter(Column::Status.ne(EnrollmentStatus::Cancelled))
            .one(db)
            .await
    }

    pub async fn is_enrolled<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        member_id: i64,
    ) -> Result<bool, DbErr> {
        let count = Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::MemberId.eq(member_id))
            .filter(Column::Status.eq(EnrollmentStatus::Enrolled))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn waitlist_len<C: ConnectionTrait>(db: &C, session_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(EnrollmentStatus::Waitlisted))
            .count(db)
            .await
    }

    /// Head of the waitlist (lowest position).
    pub async fn first_waitlisted<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(EnrollmentStatus::Waitlisted))
            .order_by_asc(Column::Position)
            .one(db)
            .await
    }

    /// Moves every waitlisted entry behind `position` one place forward.
    pub async fn close_waitlist_gap<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        position: i32,
    ) -> Result<u64, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Position, Expr::col(Column::Position).sub(1))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(EnrollmentStatus::Waitlisted))
            .filter(Column::Position.gt(position))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn mark_cancelled<C: ConnectionTrait>(db: &C, entry: Model) -> Result<Model, DbErr> {
        let now = Utc::now();
        let mut active: ActiveModel = entry.into();
        active.status = Set(EnrollmentStatus::Cancelled);
        active.position = Set(None);
        active.cancelled_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await
    }

    pub async fn mark_enrolled<C: ConnectionTrait>(db: &C, entry: Model) -> Result<Model, DbErr> {
        let now = Utc::now();
        let mut active: ActiveModel = entry.into();
        active.status = Set(EnrollmentStatus::Enrolled);
        active.position = Set(None);
        active.enrolled_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await
    }

    /// Enrolled entries in admission order, then the waitlist in position order.
    pub async fn roster<C: ConnectionTrait>(db: &C, session_id: i64) -> Result<Vec<Model>, DbErr> {
        let mut enrolled = Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(EnrollmentStatus::Enrolled))
            .order_by_asc(Column::EnrolledAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await?;
        let waitlisted = Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(EnrollmentStatus::Waitlisted))
            .order_by_asc(Column::Position)
            .all(db)
            .await?;
        enrolled.extend(waitlisted);
        Ok(enrolled)
    }

    pub async fn enrolled_member_ids<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::MemberId)
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.eq(EnrollmentStatus::Enrolled))
            .order_by_asc(Column::MemberId)
            .into_tuple::<i64>()
            .all(db)
            .await
    }

    pub async fn active_for_member<C: ConnectionTrait>(
        db: &C,
        member_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::MemberId.eq(member_id))
            .filter(Column::Status.ne(EnrollmentStatus::Cancelled))
            .order_by_asc(Column::SessionId)
            .all(db)
            .await
    }
}
