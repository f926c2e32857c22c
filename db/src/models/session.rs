use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use serde::Serialize;

/// A scheduled class: a daily time window over an inclusive date range,
/// with a fixed number of seats.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "class_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub trainer_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
    /// Written only by the enrollment engine.
    pub enrolled_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TrainerId",
        to = "super::user::Column::Id"
    )]
    Trainer,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
    #[sea_orm(has_many = "super::attendance_token::Entity")]
    Tokens,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl Related<super::attendance_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields needed to put a session on the schedule.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub trainer_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
}

impl Model {
    pub async fn create<C: ConnectionTrait>(db: &C, new: NewSession) -> Result<Model, DbErr> {
        let now = Utc::now();

        ActiveModel {
            trainer_id: Set(new.trainer_id),
            title: Set(new.title),
            location: Set(new.location),
            starts_on: Set(new.starts_on),
            ends_on: Set(new.ends_on),
            start_time: Set(new.start_time),
            end_time: Set(new.end_time),
            capacity: Set(new.capacity),
            enrolled_count: Set(0),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        self.starts_on <= date && date <= self.ends_on
    }

    /// Scheduled start and end instants of the occurrence on `date`.
    pub fn window_on(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            date.and_time(self.start_time).and_utc(),
            date.and_time(self.end_time).and_utc(),
        )
    }

    pub fn seats_left(&self) -> i32 {
        (self.capacity - self.enrolled_count).max(0)
    }

    /// Takes one seat if one is free. Returns `false` when the session is full.
    ///
    /// The comparison and the increment are a single conditional `UPDATE`, so two
    /// writers can never both take the last seat.
    pub async fn try_take_seat<C: ConnectionTrait>(db: &C, session_id: i64) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(
                Column::EnrolledCount,
                Expr::col(Column::EnrolledCount).add(1),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(session_id))
            .filter(Expr::col(Column::EnrolledCount).lt(Expr::col(Column::Capacity)))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Gives one seat back. Never drives the counter below zero.
    pub async fn release_seat<C: ConnectionTrait>(db: &C, session_id: i64) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(
                Column::EnrolledCount,
                Expr::col(Column::EnrolledCount).sub(1),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(session_id))
            .filter(Column::EnrolledCount.gt(0))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Sets a new capacity unless it would drop below the seats already taken.
    pub async fn try_set_capacity<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        capacity: i32,
    ) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Capacity, Expr::value(capacity))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(session_id))
            .filter(Column::EnrolledCount.lte(capacity))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    pub async fn find_for_trainer<C: ConnectionTrait>(
        db: &C,
        trainer_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TrainerId.eq(trainer_id))
            .all(db)
            .await
    }
}
