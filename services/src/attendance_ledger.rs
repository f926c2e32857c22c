//! Daily attendance records and the rules that derive them from scans.
//!
//! Scans only touch timestamps and the derived lateness fields; status follows
//! a check-in unless the record is excused, cancelled or manually set.

use crate::ServiceResult;
use crate::directory;
use crate::error::ServiceError;
use crate::locks::RECORD_LOCKS;
use crate::notifier::{Notifier, SessionEvent};
use crate::retry::with_retry;
use crate::session_registry::find_session;
use chrono::{DateTime, NaiveDate, Utc};
use db::models::attendance_record::{AttendanceStatus, Model as AttendanceRecord, RecordFilter};
use db::models::session::Model as Session;
use db::models::token_scan::ScanKind;
use db::models::user::Entity as UserEntity;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, TransactionTrait};
use serde::Serialize;

/// A staff member's direct edit of one record.
#[derive(Debug, Clone, Default)]
pub struct ManualMark {
    pub date: NaiveDate,
    /// Required unless `reopen` is set.
    pub status: Option<AttendanceStatus>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Hand the record back to automatic derivation.
    pub reopen: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub session_id: Option<i64>,
    pub member_id: Option<i64>,
    pub trainer_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceStats {
    pub total: u64,
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    pub excused: u64,
    pub cancelled: u64,
    pub attendance_rate: f64,
}

fn set_arrival(rec: &mut AttendanceRecord, at: DateTime<Utc>) {
    rec.check_in_at = Some(at);
    rec.is_late = at > rec.scheduled_start;
    rec.minutes_late = if rec.is_late {
        (at - rec.scheduled_start).num_minutes() as i32
    } else {
        0
    };
}

fn set_departure(rec: &mut AttendanceRecord, at: DateTime<Utc>) {
    rec.check_out_at = Some(at);
    rec.left_early = at < rec.scheduled_end;
    rec.minutes_early = if rec.left_early {
        (rec.scheduled_end - at).num_minutes() as i32
    } else {
        0
    };
}

fn arrival_status(rec: &AttendanceRecord) -> AttendanceStatus {
    match rec.check_in_at {
        Some(_) if rec.is_late => AttendanceStatus::Late,
        Some(_) => AttendanceStatus::Present,
        None => AttendanceStatus::Absent,
    }
}

/// Applies an automatic check-in. The earliest check-in wins.
pub fn apply_check_in(rec: &mut AttendanceRecord, at: DateTime<Utc>, location: Option<String>) {
    if matches!(rec.check_in_at, Some(existing) if existing <= at) {
        return;
    }
    set_arrival(rec, at);
    if location.is_some() {
        rec.check_in_location = location;
    }
    if !rec.manual_override && !rec.status.is_sticky() {
        rec.status = arrival_status(rec);
    }
}

/// Applies an automatic check-out. Status is never touched.
pub fn apply_check_out(rec: &mut AttendanceRecord, at: DateTime<Utc>) {
    set_departure(rec, at);
}

pub fn apply_manual(rec: &mut AttendanceRecord, mark: &ManualMark, marked_by: i64) {
    if let Some(at) = mark.check_in_at {
        set_arrival(rec, at);
    }
    if let Some(at) = mark.check_out_at {
        set_departure(rec, at);
    }
    if let Some(notes) = &mark.notes {
        rec.notes = Some(notes.clone());
    }
    rec.marked_by = Some(marked_by);

    if mark.reopen {
        rec.manual_override = false;
        rec.status = mark.status.unwrap_or_else(|| arrival_status(rec));
    } else if let Some(status) = mark.status {
        rec.manual_override = true;
        rec.status = status;
    }
}

pub fn summarize(records: &[AttendanceRecord]) -> AttendanceStats {
    let mut stats = AttendanceStats {
        total: records.len() as u64,
        ..Default::default()
    };
    for r in records {
        match r.status {
            AttendanceStatus::Present => stats.present += 1,
            AttendanceStatus::Late => stats.late += 1,
            AttendanceStatus::Absent => stats.absent += 1,
            AttendanceStatus::Excused => stats.excused += 1,
            AttendanceStatus::Cancelled => stats.cancelled += 1,
        }
    }
    let attended = stats.present + stats.late;
    let denominator = attended + stats.absent;
    stats.attendance_rate = if denominator == 0 {
        0.0
    } else {
        attended as f64 / denominator as f64
    };
    stats
}

async fn load_or_blank<C: ConnectionTrait>(
    conn: &C,
    session: &Session,
    member_id: i64,
    date: NaiveDate,
) -> Result<AttendanceRecord, DbErr> {
    if let Some(existing) = AttendanceRecord::find_by_key(conn, member_id, session.id, date).await? {
        return Ok(existing);
    }
    let (start, end) = session.window_on(date);
    Ok(AttendanceRecord::blank(member_id, session.id, date, start, end))
}

/// Folds one accepted scan into the day's record. Runs inside the scan's
/// transaction; the caller holds the record lock.
pub(crate) async fn record_scan<C: ConnectionTrait>(
    conn: &C,
    session: &Session,
    member_id: i64,
    kind: ScanKind,
    at: DateTime<Utc>,
    location: Option<String>,
) -> Result<AttendanceRecord, DbErr> {
    let mut rec = load_or_blank(conn, session, member_id, at.date_naive()).await?;
    match kind {
        ScanKind::CheckIn => apply_check_in(&mut rec, at, location),
        ScanKind::CheckOut => apply_check_out(&mut rec, at),
    }
    rec.save(conn).await
}

pub struct AttendanceLedger;

impl AttendanceLedger {
    /// Sets a record directly on behalf of the session's trainer or an admin.
    pub async fn mark_manually(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        session_id: i64,
        member_id: i64,
        actor_id: i64,
        mark: ManualMark,
    ) -> ServiceResult<AttendanceRecord> {
        let session = find_session(db, session_id).await?;
        directory::require_manager(db, actor_id, &session).await?;
        UserEntity::find_by_id(member_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", member_id))?;

        if mark.status.is_none() && !mark.reopen {
            return Err(ServiceError::Invalid(
                "status is required unless reopening".into(),
            ));
        }
        if !session.is_scheduled_on(mark.date) {
            return Err(ServiceError::Invalid(format!(
                "session {session_id} is not scheduled on {}",
                mark.date
            )));
        }
        if let (Some(i), Some(o)) = (mark.check_in_at, mark.check_out_at) {
            if o < i {
                return Err(ServiceError::Invalid(
                    "check_out_at must not be before check_in_at".into(),
                ));
            }
        }

        let _guard = RECORD_LOCKS.lock((member_id, session_id, mark.date)).await;
        let (session, mark) = (&session, &mark);
        let record = with_retry("attendance.mark", || {
            mark_txn(db, session, member_id, actor_id, mark)
        })
        .await?;

        tracing::info!(
            session_id,
            member_id,
            marked_by = actor_id,
            status = %record.status,
            manual_override = record.manual_override,
            "Attendance marked manually"
        );
        notifier
            .notify(SessionEvent::AttendanceRecorded {
                record: record.clone(),
            })
            .await;
        Ok(record)
    }

    /// Records of one session, optionally narrowed to a single day.
    pub async fn session_records(
        db: &DatabaseConnection,
        session_id: i64,
        date: Option<NaiveDate>,
    ) -> ServiceResult<Vec<AttendanceRecord>> {
        find_session(db, session_id).await?;
        let records = match date {
            Some(date) => AttendanceRecord::for_session_on(db, session_id, date).await?,
            None => {
                let filter = RecordFilter {
                    session_ids: Some(vec![session_id]),
                    ..Default::default()
                };
                AttendanceRecord::matching(db, &filter).await?
            }
        };
        Ok(records)
    }

    pub async fn stats(db: &DatabaseConnection, filter: StatsFilter) -> ServiceResult<AttendanceStats> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ServiceError::Invalid("from must not be after to".into()));
            }
        }

        let session_ids = match (filter.trainer_id, filter.session_id) {
            (Some(trainer_id), session_id) => {
                let mut ids: Vec<i64> = Session::find_for_trainer(db, trainer_id)
                    .await?
                    .into_iter()
                    .map(|s| s.id)
                    .collect();
                if let Some(session_id) = session_id {
                    ids.retain(|id| *id == session_id);
                }
                Some(ids)
            }
            (None, Some(session_id)) => Some(vec![session_id]),
            (None, None) => None,
        };

        let records = AttendanceRecord::matching(
            db,
            &RecordFilter {
                session_ids,
                member_id: filter.member_id,
                from: filter.from,
                to: filter.to,
            },
        )
        .await?;
        Ok(summarize(&records))
    }
}

async fn mark_txn(
    db: &DatabaseConnection,
    session: &Session,
    member_id: i64,
    actor_id: i64,
    mark: &ManualMark,
) -> ServiceResult<AttendanceRecord> {
    let txn = db.begin().await?;
    let mut rec = load_or_blank(&txn, session, member_id, mark.date).await?;
    apply_manual(&mut rec, mark, actor_id);
    if let (Some(i), Some(o)) = (rec.check_in_at, rec.check_out_at) {
        if o < i {
            return Err(ServiceError::Invalid(
                "check_out_at must not be before check_in_at".into(),
            ));
        }
    }
    let saved = rec.save(&txn).await?;
    txn.commit().await?;
    Ok(saved)
}
