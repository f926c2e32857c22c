use db::models::attendance_record::{AttendanceStatus, Model as AttendanceRecord};
use db::models::attendance_token::{Model as AttendanceToken, TokenSessionType};
use db::models::enrollment::{EnrollmentStatus, Model as Enrollment};
use db::models::session::Model as Session;
use serde::Serialize;
use util::state::AppState;

use crate::ws::WsNotifier;

/// Notifier that fans engine events out over the WebSocket topics.
pub fn notifier(state: &AppState) -> WsNotifier {
    WsNotifier::new(state.ws_clone())
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub trainer_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub starts_on: String,
    pub ends_on: String,
    pub start_time: String,
    pub end_time: String,
    pub capacity: i32,
    pub enrolled_count: i32,
    pub seats_left: i32,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            seats_left: s.seats_left(),
            id: s.id,
            trainer_id: s.trainer_id,
            title: s.title,
            location: s.location,
            starts_on: s.starts_on.to_string(),
            ends_on: s.ends_on.to_string(),
            start_time: s.start_time.format("%H:%M:%S").to_string(),
            end_time: s.end_time.format("%H:%M:%S").to_string(),
            capacity: s.capacity,
            enrolled_count: s.enrolled_count,
            active: s.active,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub id: i64,
    pub session_id: i64,
    pub member_id: i64,
    pub status: EnrollmentStatus,
    pub position: Option<i32>,
    pub enrolled_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            session_id: e.session_id,
            member_id: e.member_id,
            status: e.status,
            position: e.position,
            enrolled_at: e.enrolled_at.map(|t| t.to_rfc3339()),
            cancelled_at: e.cancelled_at.map(|t| t.to_rfc3339()),
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: i64,
    pub session_id: i64,
    pub value: String,
    pub issued_by: i64,
    pub session_type: TokenSessionType,
    pub expires_at: String,
    pub max_usage: i32,
    pub usage_count: i32,
    pub active: bool,
}

impl From<AttendanceToken> for TokenResponse {
    fn from(t: AttendanceToken) -> Self {
        Self {
            id: t.id,
            session_id: t.session_id,
            value: t.value,
            issued_by: t.issued_by,
            session_type: t.session_type,
            expires_at: t.expires_at.to_rfc3339(),
            max_usage: t.max_usage,
            usage_count: t.usage_count,
            active: t.active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceRecordResponse {
    pub id: i64,
    pub member_id: i64,
    pub session_id: i64,
    pub date: String,
    pub scheduled_start: String,
    pub scheduled_end: String,
    pub check_in_at: Option<String>,
    pub check_out_at: Option<String>,
    pub status: AttendanceStatus,
    pub is_late: bool,
    pub minutes_late: i32,
    pub left_early: bool,
    pub minutes_early: i32,
    /// Minutes between check-in and check-out, once both are known.
    pub duration_attended: Option<i64>,
    pub manual_override: bool,
    pub marked_by: Option<i64>,
    pub notes: Option<String>,
    pub check_in_location: Option<String>,
    pub updated_at: String,
}

impl From<AttendanceRecord> for AttendanceRecordResponse {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            duration_attended: r.duration_attended(),
            id: r.id,
            member_id: r.member_id,
            session_id: r.session_id,
            date: r.date.to_string(),
            scheduled_start: r.scheduled_start.to_rfc3339(),
            scheduled_end: r.scheduled_end.to_rfc3339(),
            check_in_at: r.check_in_at.map(|t| t.to_rfc3339()),
            check_out_at: r.check_out_at.map(|t| t.to_rfc3339()),
            status: r.status,
            is_late: r.is_late,
            minutes_late: r.minutes_late,
            left_early: r.left_early,
            minutes_early: r.minutes_early,
            manual_override: r.manual_override,
            marked_by: r.marked_by,
            notes: r.notes,
            check_in_location: r.check_in_location,
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}
