use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One member's attendance at one occurrence of a session.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub member_id: i64,
    pub session_id: i64,
    pub date: NaiveDate,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub is_late: bool,
    pub minutes_late: i32,
    pub left_early: bool,
    pub minutes_early: i32,
    /// Set by a manual mark; scans then leave the status alone.
    pub manual_override: bool,
    pub marked_by: Option<i64>,
    pub notes: Option<String>,
    pub check_in_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "absent")]
    Absent,

    #[sea_orm(string_value = "present")]
    Present,

    #[sea_orm(string_value = "late")]
    Late,

    #[sea_orm(string_value = "excused")]
    Excused,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl AttendanceStatus {
    /// Statuses a scan is not allowed to overwrite.
    pub fn is_sticky(self) -> bool {
        matches!(self, AttendanceStatus::Excused | AttendanceStatus::Cancelled)
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

impl ActiveModelBehavior for ActiveModel {}

/// Query window for statistics. Every field narrows the result when set.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub session_ids: Option<Vec<i64>>,
    pub member_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Model {
    /// A fresh, unsaved record for the occurrence, marked absent. `id` is 0
    /// until inserted.
    pub fn blank(
        member_id: i64,
        session_id: i64,
        date: NaiveDate,
        scheduled_start: DateTime<Utc>,
        scheduled_end: DateTime<Utc>,
    ) -> Model {
        let now = Utc::now();
        Model {
            id: 0,
            member_id,
            session_id,
            date,
            scheduled_start,
            scheduled_end,
            check_in_at: None,
            check_out_at: None,
            status: AttendanceStatus::Absent,
            is_late: false,
            minutes_late: 0,
            left_early: false,
            minutes_early: 0,
            manual_override: false,
            marked_by: None,
            notes: None,
            check_in_location: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Inserts the record when `id` is 0, otherwise overwrites the stored row.
    pub async fn save<C: ConnectionTrait>(self, db: &C) -> Result<Model, DbErr> {
        let is_new = self.id == 0;
        let mut active = ActiveModel::from(self).reset_all();
        active.updated_at = Set(Utc::now());
        if is_new {
            active.id = NotSet;
            active.insert(db).await
        } else {
            active.update(db).await
        }
    }

    pub async fn find_by_key<C: ConnectionTrait>(
        db: &C,
        member_id: i64,
        session_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::MemberId.eq(member_id))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Date.eq(date))
            .one(db)
            .await
    }

    pub async fn for_session_on<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Date.eq(date))
            .order_by_asc(Column::MemberId)
            .all(db)
            .await
    }

    pub async fn matching<C: ConnectionTrait>(
        db: &C,
        filter: &RecordFilter,
    ) -> Result<Vec<Model>, DbErr> {
        let mut cond = Condition::all();
        if let Some(ids) = &filter.session_ids {
            cond = cond.add(Column::SessionId.is_in(ids.clone()));
        }
        if let Some(member_id) = filter.member_id {
            cond = cond.add(Column::MemberId.eq(member_id));
        }
        if let Some(from) = filter.from {
            cond = cond.add(Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            cond = cond.add(Column::Date.lte(to));
        }

        Entity::find()
            .filter(cond)
            .order_by_asc(Column::Date)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Whole minutes between check-in and check-out, when both are known.
    pub fn duration_attended(&self) -> Option<i64> {
        match (self.check_in_at, self.check_out_at) {
            (Some(i), Some(o)) if o >= i => Some((o - i).num_minutes()),
            _ => None,
        }
    }
}
