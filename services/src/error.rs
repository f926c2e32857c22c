use db::models::token_scan::ScanKind;
use sea_orm::DbErr;
use serde_json::{Value, json};
use thiserror::Error;

/// Coarse failure category callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Inactive,
    Expired,
    Conflict,
    Forbidden,
    Invalid,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is no longer active")]
    Inactive(String),

    #[error("{0} has expired")]
    Expired(String),

    #[error("member {member_id} already holds a place in session {session_id}")]
    AlreadyEnrolled { session_id: i64, member_id: i64 },

    #[error("member {member_id} is not enrolled in session {session_id}")]
    NotEnrolled { session_id: i64, member_id: i64 },

    #[error("capacity {capacity} is below the {enrolled_count} seats already taken")]
    CapacityConflict { capacity: i32, enrolled_count: i32 },

    #[error("token already used {usage_count} of {max_usage} times")]
    UsageExceeded { usage_count: i32, max_usage: i32 },

    #[error("member {member_id} already recorded {kind} with this token")]
    DuplicateScan { member_id: i64, kind: ScanKind },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Internal(#[from] DbErr),
}

impl ServiceError {
    /// `NotEnrolled` is reported as a conflict with the member's enrollment state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Inactive(_) => ErrorKind::Inactive,
            ServiceError::Expired(_) => ErrorKind::Expired,
            ServiceError::AlreadyEnrolled { .. }
            | ServiceError::NotEnrolled { .. }
            | ServiceError::CapacityConflict { .. }
            | ServiceError::UsageExceeded { .. }
            | ServiceError::DuplicateScan { .. } => ErrorKind::Conflict,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::Invalid(_) => ErrorKind::Invalid,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Structured detail for the caller: which rule fired and the counts involved.
    pub fn detail(&self) -> Option<Value> {
        match self {
            ServiceError::AlreadyEnrolled {
                session_id,
                member_id,
            } => Some(json!({
                "reason": "already_enrolled",
                "session_id": session_id,
                "member_id": member_id,
            })),
            ServiceError::NotEnrolled {
                session_id,
                member_id,
            } => Some(json!({
                "reason": "not_enrolled",
                "session_id": session_id,
                "member_id": member_id,
            })),
            ServiceError::CapacityConflict {
                capacity,
                enrolled_count,
            } => Some(json!({
                "reason": "capacity",
                "capacity": capacity,
                "enrolled_count": enrolled_count,
            })),
            ServiceError::UsageExceeded {
                usage_count,
                max_usage,
            } => Some(json!({
                "reason": "usage_exceeded",
                "usage_count": usage_count,
                "max_usage": max_usage,
            })),
            ServiceError::DuplicateScan { member_id, kind } => Some(json!({
                "reason": "duplicate_scan",
                "member_id": member_id,
                "kind": kind,
            })),
            _ => None,
        }
    }

    pub(crate) fn not_found(what: impl std::fmt::Display, id: i64) -> Self {
        ServiceError::NotFound(format!("{what} {id}"))
    }
}
