//! Sessions on the schedule: create, look up, reschedule and close.
//!
//! Capacity changes go through the enrollment engine, which owns
//! `enrolled_count`. [`SessionRegistry::edit`] combines both in one transaction.

use crate::ServiceResult;
use crate::directory;
use crate::enrollment::apply_resize;
use crate::error::ServiceError;
use crate::locks::SESSION_LOCKS;
use crate::notifier::{Notifier, SessionEvent};
use crate::retry::with_retry;
use chrono::{NaiveDate, NaiveTime, Utc};
use db::models::attendance_token::Model as AttendanceToken;
use db::models::enrollment::Model as Enrollment;
use db::models::session::{ActiveModel, Entity as SessionEntity, Model as Session, NewSession};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Serialize;

/// Fields a reschedule may change. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct Reschedule {
    pub trainer_id: Option<i64>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl Reschedule {
    pub fn is_empty(&self) -> bool {
        self.trainer_id.is_none()
            && self.title.is_none()
            && self.location.is_none()
            && self.starts_on.is_none()
            && self.ends_on.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }
}

fn validate_window(
    starts_on: NaiveDate,
    ends_on: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> ServiceResult<()> {
    if starts_on > ends_on {
        return Err(ServiceError::Invalid(
            "starts_on must not be after ends_on".into(),
        ));
    }
    if start_time >= end_time {
        return Err(ServiceError::Invalid(
            "start_time must be before end_time".into(),
        ));
    }
    Ok(())
}

async fn check_changes(db: &DatabaseConnection, changes: &Reschedule) -> ServiceResult<()> {
    if let Some(title) = &changes.title {
        if title.trim().is_empty() {
            return Err(ServiceError::Invalid("title must not be empty".into()));
        }
    }
    if let Some(trainer_id) = changes.trainer_id {
        directory::active_staff(db, trainer_id).await?;
    }
    Ok(())
}

pub(crate) async fn find_session<C: ConnectionTrait>(db: &C, session_id: i64) -> ServiceResult<Session> {
    SessionEntity::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("session", session_id))
}

/// Result of [`SessionRegistry::edit`]: the stored session and anyone moved
/// off the waitlist by a larger capacity.
#[derive(Debug, Clone, Serialize)]
pub struct EditOutcome {
    pub session: Session,
    pub promoted: Vec<Enrollment>,
}

pub struct SessionRegistry;

impl SessionRegistry {
    pub async fn create(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        new: NewSession,
    ) -> ServiceResult<Session> {
        if new.capacity <= 0 {
            return Err(ServiceError::Invalid("capacity must be positive".into()));
        }
        if new.title.trim().is_empty() {
            return Err(ServiceError::Invalid("title must not be empty".into()));
        }
        validate_window(new.starts_on, new.ends_on, new.start_time, new.end_time)?;
        directory::active_staff(db, new.trainer_id).await?;

        let new = &new;
        let session = with_retry("session.create", || insert(db, new)).await?;

        tracing::info!(
            session_id = session.id,
            trainer_id = session.trainer_id,
            capacity = session.capacity,
            "Session scheduled"
        );
        notifier
            .notify(SessionEvent::Scheduled {
                session: session.clone(),
            })
            .await;
        Ok(session)
    }

    pub async fn get(db: &DatabaseConnection, session_id: i64) -> ServiceResult<Session> {
        find_session(db, session_id).await
    }

    pub async fn reschedule(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        session_id: i64,
        changes: Reschedule,
    ) -> ServiceResult<Session> {
        if changes.is_empty() {
            return Err(ServiceError::Invalid("nothing to change".into()));
        }
        check_changes(db, &changes).await?;

        let _guard = SESSION_LOCKS.lock(session_id).await;
        let changes = &changes;
        let (session, member_ids) = with_retry("session.reschedule", || {
            reschedule_txn(db, session_id, changes)
        })
        .await?;

        tracing::info!(session_id, members = member_ids.len(), "Session rescheduled");
        notifier
            .notify(SessionEvent::Rescheduled {
                session: session.clone(),
                member_ids,
            })
            .await;
        Ok(session)
    }

    /// Schedule changes and a capacity change applied together: either both
    /// are stored or neither is. Members are told only once the edit commits.
    pub async fn edit(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        session_id: i64,
        changes: Reschedule,
        capacity: Option<i32>,
    ) -> ServiceResult<EditOutcome> {
        if changes.is_empty() && capacity.is_none() {
            return Err(ServiceError::Invalid("nothing to change".into()));
        }
        if matches!(capacity, Some(c) if c <= 0) {
            return Err(ServiceError::Invalid("capacity must be positive".into()));
        }
        check_changes(db, &changes).await?;

        let _guard = SESSION_LOCKS.lock(session_id).await;
        let changes = &changes;
        let (outcome, member_ids) = with_retry("session.edit", || {
            edit_txn(db, session_id, changes, capacity)
        })
        .await?;

        tracing::info!(
            session_id,
            capacity = outcome.session.capacity,
            promoted = outcome.promoted.len(),
            "Session edited"
        );
        if !changes.is_empty() {
            notifier
                .notify(SessionEvent::Rescheduled {
                    session: outcome.session.clone(),
                    member_ids,
                })
                .await;
        }
        Ok(outcome)
    }

    /// Takes the session off the schedule and retires its token.
    pub async fn close(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        session_id: i64,
    ) -> ServiceResult<Session> {
        let _guard = SESSION_LOCKS.lock(session_id).await;
        let (session, member_ids) =
            with_retry("session.close", || close_txn(db, session_id)).await?;

        tracing::info!(session_id, members = member_ids.len(), "Session closed");
        notifier
            .notify(SessionEvent::Cancelled {
                session_id,
                member_ids,
            })
            .await;
        Ok(session)
    }
}

async fn insert(db: &DatabaseConnection, new: &NewSession) -> ServiceResult<Session> {
    Ok(Session::create(db, new.clone()).await?)
}

async fn reschedule_txn(
    db: &DatabaseConnection,
    session_id: i64,
    changes: &Reschedule,
) -> ServiceResult<(Session, Vec<i64>)> {
    let txn = db.begin().await?;
    let session = apply_reschedule(&txn, session_id, changes).await?;
    let member_ids = Enrollment::enrolled_member_ids(&txn, session_id).await?;
    txn.commit().await?;
    Ok((session, member_ids))
}

async fn edit_txn(
    db: &DatabaseConnection,
    session_id: i64,
    changes: &Reschedule,
    capacity: Option<i32>,
) -> ServiceResult<(EditOutcome, Vec<i64>)> {
    let txn = db.begin().await?;
    if !changes.is_empty() {
        apply_reschedule(&txn, session_id, changes).await?;
    }
    let promoted = match capacity {
        Some(capacity) => apply_resize(&txn, session_id, capacity).await?,
        None => Vec::new(),
    };

    let session = find_session(&txn, session_id).await?;
    let member_ids = Enrollment::enrolled_member_ids(&txn, session_id).await?;
    txn.commit().await?;
    Ok((EditOutcome { session, promoted }, member_ids))
}

async fn apply_reschedule<C: ConnectionTrait>(
    conn: &C,
    session_id: i64,
    changes: &Reschedule,
) -> ServiceResult<Session> {
    let current = find_session(conn, session_id).await?;
    if !current.active {
        return Err(ServiceError::Inactive(format!("session {session_id}")));
    }

    let starts_on = changes.starts_on.unwrap_or(current.starts_on);
    let ends_on = changes.ends_on.unwrap_or(current.ends_on);
    let start_time = changes.start_time.unwrap_or(current.start_time);
    let end_time = changes.end_time.unwrap_or(current.end_time);
    validate_window(starts_on, ends_on, start_time, end_time)?;

    let mut active: ActiveModel = current.into();
    if let Some(trainer_id) = changes.trainer_id {
        active.trainer_id = Set(trainer_id);
    }
    if let Some(title) = &changes.title {
        active.title = Set(title.clone());
    }
    if let Some(location) = &changes.location {
        active.location = Set(Some(location.clone()));
    }
    active.starts_on = Set(starts_on);
    active.ends_on = Set(ends_on);
    active.start_time = Set(start_time);
    active.end_time = Set(end_time);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

async fn close_txn(
    db: &DatabaseConnection,
    session_id: i64,
) -> ServiceResult<(Session, Vec<i64>)> {
    let txn = db.begin().await?;
    let current = find_session(&txn, session_id).await?;
    if !current.active {
        return Err(ServiceError::Inactive(format!("session {session_id}")));
    }

    let mut active: ActiveModel = current.into();
    active.active = Set(false);
    active.updated_at = Set(Utc::now());
    let session = active.update(&txn).await?;

    let retired = AttendanceToken::deactivate_for_session(&txn, session_id).await?;
    let member_ids = Enrollment::enrolled_member_ids(&txn, session_id).await?;
    txn.commit().await?;

    tracing::debug!(session_id, retired, "Retired tokens of closed session");
    Ok((session, member_ids))
}
