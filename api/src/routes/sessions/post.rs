use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use db::models::enrollment::EnrollmentStatus;
use db::models::session::NewSession;
use services::attendance_token::{AttendanceTokenService, IssueToken, TokenLimits};
use services::enrollment::EnrollmentService;
use services::session_registry::SessionRegistry;
use util::state::AppState;
use validator::Validate;

use super::common::{CreateSessionReq, EnrollQuery, IssueTokenReq};
use crate::auth::AuthUser;
use crate::error::{forbidden, service_error, validation_error};
use crate::response::ApiResponse;
use crate::routes::common::{EnrollmentResponse, SessionResponse, TokenResponse, notifier};

/// POST /api/sessions
///
/// Schedules a class. Admin only.
///
/// ### Request Body
/// ```json
/// {
///   "trainer_id": 2, "title": "Spin", "location": "Studio B",
///   "starts_on": "2025-03-10", "ends_on": "2025-03-31",
///   "start_time": "09:00:00", "end_time": "10:00:00", "capacity": 12
/// }
/// ```
///
/// ### Responses
/// - `201 Created` with the session
/// - `400 Bad Request` for a bad window, non-positive capacity, or a trainer without a staff role
/// - `404 Not Found` if the trainer does not exist
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionReq>,
) -> Response {
    if let Err(e) = req.validate() {
        return validation_error(&e);
    }

    let new = NewSession {
        trainer_id: req.trainer_id,
        title: req.title,
        location: req.location,
        starts_on: req.starts_on,
        ends_on: req.ends_on.unwrap_or(req.starts_on),
        start_time: req.start_time,
        end_time: req.end_time,
        capacity: req.capacity,
    };

    match SessionRegistry::create(state.db(), &notifier(&state), new).await {
        Ok(session) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Session scheduled",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// POST /api/sessions/{session_id}/enrollments
///
/// Enrolls the caller, or `?member_id=` when the caller is an admin. A full
/// session puts the member on the waitlist instead.
///
/// ### Responses
/// - `201 Created` with the entry (`status` is `enrolled` or `waitlisted`)
/// - `403 Forbidden` when a non-admin names another member
/// - `404 Not Found` for an unknown session or member
/// - `409 Conflict` if the member already holds a place
/// - `410 Gone` if the session is closed or the member inactive
pub async fn enroll(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(query): Query<EnrollQuery>,
) -> Response {
    let member_id = query.member_id.unwrap_or(claims.sub);
    if member_id != claims.sub && !claims.admin {
        return forbidden("Only admins may enroll other members");
    }

    match EnrollmentService::enroll(state.db(), session_id, member_id).await {
        Ok(entry) => {
            let message = match entry.status {
                EnrollmentStatus::Waitlisted => "Session full, added to waitlist",
                _ => "Enrolled",
            };
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(EnrollmentResponse::from(entry), message)),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

/// POST /api/sessions/{session_id}/tokens
///
/// Issues the attendance token for the session, or returns the current one
/// while it is still valid. Session trainer or admin.
///
/// ### Request Body (all optional)
/// ```json
/// { "session_type": "both", "ttl_seconds": 900, "max_usage": 24 }
/// ```
///
/// ### Responses
/// - `201 Created` with the token
/// - `400 Bad Request` for a non-positive or oversized ttl, or non-positive max_usage
/// - `403 Forbidden` unless the caller trains the session or is an admin
/// - `410 Gone` for a closed session
pub async fn issue_token(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<IssueTokenReq>,
) -> Response {
    if let Err(e) = req.validate() {
        return validation_error(&e);
    }

    let params = IssueToken {
        session_type: req.session_type,
        ttl_seconds: req.ttl_seconds,
        max_usage: req.max_usage,
    };

    match AttendanceTokenService::issue(
        state.db(),
        session_id,
        claims.sub,
        params,
        TokenLimits::from_config(),
        Utc::now(),
    )
    .await
    {
        Ok(token) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                TokenResponse::from(token),
                "Attendance token ready",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
