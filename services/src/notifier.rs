//! Outbound session notifications.
//!
//! Engines publish after their transaction commits. Delivery is best effort and
//! never fails the operation that triggered it.

use async_trait::async_trait;
use db::models::attendance_record::Model as AttendanceRecord;
use db::models::session::Model as Session;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Scheduled {
        session: Session,
    },
    Rescheduled {
        session: Session,
        member_ids: Vec<i64>,
    },
    Cancelled {
        session_id: i64,
        member_ids: Vec<i64>,
    },
    AttendanceRecorded {
        record: AttendanceRecord,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Scheduled { .. } => "session.scheduled",
            SessionEvent::Rescheduled { .. } => "session.rescheduled",
            SessionEvent::Cancelled { .. } => "session.cancelled",
            SessionEvent::AttendanceRecorded { .. } => "attendance.recorded",
        }
    }

    pub fn session_id(&self) -> i64 {
        match self {
            SessionEvent::Scheduled { session } | SessionEvent::Rescheduled { session, .. } => {
                session.id
            }
            SessionEvent::Cancelled { session_id, .. } => *session_id,
            SessionEvent::AttendanceRecorded { record } => record.session_id,
        }
    }

    pub fn topic(&self) -> String {
        format!("sessions:{}", self.session_id())
    }

    pub fn payload(&self) -> Value {
        match self {
            SessionEvent::Scheduled { session } => json!({ "session": session }),
            SessionEvent::Rescheduled {
                session,
                member_ids,
            } => json!({ "session": session, "member_ids": member_ids }),
            SessionEvent::Cancelled {
                session_id,
                member_ids,
            } => json!({ "session_id": session_id, "member_ids": member_ids }),
            SessionEvent::AttendanceRecorded { record } => json!({ "record": record }),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: SessionEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, event: SessionEvent) {
        tracing::trace!(event = event.name(), "Notification dropped");
    }
}
