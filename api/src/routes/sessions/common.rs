use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use db::models::attendance_record::AttendanceStatus;
use db::models::attendance_token::TokenSessionType;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::routes::common::{EnrollmentResponse, SessionResponse};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionReq {
    pub trainer_id: i64,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    pub location: Option<String>,
    pub starts_on: NaiveDate,
    /// Defaults to `starts_on` for a one-off class.
    pub ends_on: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[validate(range(min = 1, message = "capacity must be positive"))]
    pub capacity: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct EditSessionReq {
    pub trainer_id: Option<i64>,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,
    pub location: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[validate(range(min = 1, message = "capacity must be positive"))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollQuery {
    /// Admins may enroll someone else.
    pub member_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct IssueTokenReq {
    #[serde(default)]
    pub session_type: Option<TokenSessionType>,
    #[serde(default)]
    #[validate(range(min = 1, message = "ttl_seconds must be positive"))]
    pub ttl_seconds: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 1, message = "max_usage must be positive"))]
    pub max_usage: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkAttendanceReq {
    pub date: NaiveDate,
    pub status: Option<AttendanceStatus>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    #[validate(length(max = 1000, message = "notes must be at most 1000 characters"))]
    pub notes: Option<String>,
    #[serde(default)]
    pub reopen: bool,
}

#[derive(Debug, Serialize)]
pub struct EditSessionResponse {
    pub session: SessionResponse,
    /// Members moved off the waitlist by a capacity increase.
    pub promoted: Vec<EnrollmentResponse>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub new_enrolled_count: i32,
    pub promoted: Option<EnrollmentResponse>,
}
