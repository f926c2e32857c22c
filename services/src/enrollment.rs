//! Capacity-bounded admission with an ordered waitlist.
//!
//! Seats are taken and released with conditional updates on the session row,
//! under the per-session lock. A freed seat goes to the head of the waitlist in
//! the same transaction that freed it.

use crate::ServiceResult;
use crate::directory;
use crate::error::ServiceError;
use crate::locks::SESSION_LOCKS;
use crate::retry::with_retry;
use crate::session_registry::find_session;
use db::models::enrollment::{EnrollmentStatus, Model as Enrollment};
use db::models::session::Model as Session;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, SqlErr, TransactionTrait};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub new_enrolled_count: i32,
    /// Member moved off the waitlist into the freed seat, if any.
    pub promoted: Option<Enrollment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResizeOutcome {
    pub session: Session,
    pub promoted: Vec<Enrollment>,
}

pub struct EnrollmentService;

impl EnrollmentService {
    /// Admits the member if a seat is free, otherwise appends them to the waitlist.
    pub async fn enroll(
        db: &DatabaseConnection,
        session_id: i64,
        member_id: i64,
    ) -> ServiceResult<Enrollment> {
        directory::active_user(db, member_id).await?;

        let _guard = SESSION_LOCKS.lock(session_id).await;
        let entry = with_retry("enrollment.enroll", || enroll_txn(db, session_id, member_id)).await?;

        tracing::info!(
            session_id,
            member_id,
            status = %entry.status,
            position = entry.position,
            "Enrollment accepted"
        );
        Ok(entry)
    }

    /// Cancels the member's place. A freed seat is handed to the head of the
    /// waitlist before this returns.
    pub async fn cancel(
        db: &DatabaseConnection,
        session_id: i64,
        member_id: i64,
    ) -> ServiceResult<CancelOutcome> {
        let _guard = SESSION_LOCKS.lock(session_id).await;
        let outcome = with_retry("enrollment.cancel", || cancel_txn(db, session_id, member_id)).await?;

        tracing::info!(
            session_id,
            member_id,
            enrolled_count = outcome.new_enrolled_count,
            promoted = outcome.promoted.as_ref().map(|e| e.member_id),
            "Enrollment cancelled"
        );
        Ok(outcome)
    }

    /// Changes capacity. Growing it promotes waitlisted members in order.
    pub async fn resize(
        db: &DatabaseConnection,
        session_id: i64,
        capacity: i32,
    ) -> ServiceResult<ResizeOutcome> {
        if capacity <= 0 {
            return Err(ServiceError::Invalid("capacity must be positive".into()));
        }

        let _guard = SESSION_LOCKS.lock(session_id).await;
        let outcome = with_retry("enrollment.resize", || resize_txn(db, session_id, capacity)).await?;

        tracing::info!(
            session_id,
            capacity,
            promoted = outcome.promoted.len(),
            "Session capacity changed"
        );
        Ok(outcome)
    }

    /// Enrolled entries, then the waitlist in position order.
    pub async fn roster(db: &DatabaseConnection, session_id: i64) -> ServiceResult<Vec<Enrollment>> {
        find_session(db, session_id).await?;
        Ok(Enrollment::roster(db, session_id).await?)
    }

    pub async fn member_enrollments(
        db: &DatabaseConnection,
        member_id: i64,
    ) -> ServiceResult<Vec<Enrollment>> {
        Ok(Enrollment::active_for_member(db, member_id).await?)
    }
}

async fn enroll_txn(
    db: &DatabaseConnection,
    session_id: i64,
    member_id: i64,
) -> ServiceResult<Enrollment> {
    let txn = db.begin().await?;

    let session = find_session(&txn, session_id).await?;
    if !session.active {
        return Err(ServiceError::Inactive(format!("session {session_id}")));
    }
    if Enrollment::find_active(&txn, session_id, member_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::AlreadyEnrolled {
            session_id,
            member_id,
        });
    }

    let inserted = if Session::try_take_seat(&txn, session_id).await? {
        Enrollment::create_enrolled(&txn, session_id, member_id).await
    } else {
        let position = Enrollment::waitlist_len(&txn, session_id).await? as i32 + 1;
        Enrollment::create_waitlisted(&txn, session_id, member_id, position).await
    };
    let entry = inserted.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::AlreadyEnrolled {
            session_id,
            member_id,
        },
        _ => ServiceError::from(e),
    })?;

    txn.commit().await?;
    Ok(entry)
}

async fn cancel_txn(
    db: &DatabaseConnection,
    session_id: i64,
    member_id: i64,
) -> ServiceResult<CancelOutcome> {
    let txn = db.begin().await?;

    find_session(&txn, session_id).await?;
    let entry = Enrollment::find_active(&txn, session_id, member_id)
        .await?
        .ok_or(ServiceError::NotEnrolled {
            session_id,
            member_id,
        })?;

    let mut promoted = None;
    match entry.status {
        EnrollmentStatus::Enrolled => {
            Enrollment::mark_cancelled(&txn, entry).await?;
            Session::release_seat(&txn, session_id).await?;
            promoted = promote_next(&txn, session_id).await?;
        }
        EnrollmentStatus::Waitlisted => {
            let position = entry.position;
            Enrollment::mark_cancelled(&txn, entry).await?;
            if let Some(position) = position {
                Enrollment::close_waitlist_gap(&txn, session_id, position).await?;
            }
        }
        EnrollmentStatus::Cancelled => {
            return Err(ServiceError::NotEnrolled {
                session_id,
                member_id,
            });
        }
    }

    let session = find_session(&txn, session_id).await?;
    txn.commit().await?;

    Ok(CancelOutcome {
        new_enrolled_count: session.enrolled_count,
        promoted,
    })
}

async fn resize_txn(
    db: &DatabaseConnection,
    session_id: i64,
    capacity: i32,
) -> ServiceResult<ResizeOutcome> {
    let txn = db.begin().await?;
    let promoted = apply_resize(&txn, session_id, capacity).await?;
    let session = find_session(&txn, session_id).await?;
    txn.commit().await?;
    Ok(ResizeOutcome { session, promoted })
}

/// Sets the new capacity and fills any freed seats from the waitlist, inside
/// the caller's transaction. The caller holds the session lock.
pub(crate) async fn apply_resize<C: ConnectionTrait>(
    conn: &C,
    session_id: i64,
    capacity: i32,
) -> ServiceResult<Vec<Enrollment>> {
    if capacity <= 0 {
        return Err(ServiceError::Invalid("capacity must be positive".into()));
    }
    let current = find_session(conn, session_id).await?;
    if !current.active {
        return Err(ServiceError::Inactive(format!("session {session_id}")));
    }
    if !Session::try_set_capacity(conn, session_id, capacity).await? {
        return Err(ServiceError::CapacityConflict {
            capacity,
            enrolled_count: current.enrolled_count,
        });
    }

    let mut promoted = Vec::new();
    while let Some(entry) = promote_next(conn, session_id).await? {
        promoted.push(entry);
    }
    Ok(promoted)
}

/// Moves the waitlist head into a free seat. `None` when the waitlist is empty
/// or no seat is free.
async fn promote_next<C: ConnectionTrait>(
    conn: &C,
    session_id: i64,
) -> Result<Option<Enrollment>, DbErr> {
    let Some(head) = Enrollment::first_waitlisted(conn, session_id).await? else {
        return Ok(None);
    };
    if !Session::try_take_seat(conn, session_id).await? {
        return Ok(None);
    }

    let position = head.position;
    let promoted = Enrollment::mark_enrolled(conn, head).await?;
    if let Some(position) = position {
        Enrollment::close_waitlist_gap(conn, session_id, position).await?;
    }
    tracing::debug!(session_id, member_id = promoted.member_id, "Promoted from waitlist");
    Ok(Some(promoted))
}
