use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::attendance_token::AttendanceTokenService;
use services::enrollment::EnrollmentService;
use services::session_registry::SessionRegistry;
use util::state::AppState;

use super::common::CancelResponse;
use crate::auth::AuthUser;
use crate::error::{forbidden, service_error};
use crate::response::ApiResponse;
use crate::routes::common::{EnrollmentResponse, SessionResponse, notifier};

/// DELETE /api/sessions/{session_id}
///
/// Closes the session: it stops accepting enrollments and scans, and its
/// token is retired. Admin only.
///
/// - `200 OK` with the closed session
/// - `410 Gone` if it was already closed
pub async fn close_session(State(state): State<AppState>, Path(session_id): Path<i64>) -> Response {
    match SessionRegistry::close(state.db(), &notifier(&state), session_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Session closed",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// DELETE /api/sessions/{session_id}/enrollments/{member_id}
///
/// Gives up the member's place. The head of the waitlist takes a freed seat.
///
/// - `200 OK` with `{ new_enrolled_count, promoted }`
/// - `403 Forbidden` when cancelling someone else without being an admin
/// - `409 Conflict` if the member holds no place
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    Path((session_id, member_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    if member_id != claims.sub && !claims.admin {
        return forbidden("Only admins may cancel other members' enrollments");
    }

    match EnrollmentService::cancel(state.db(), session_id, member_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                CancelResponse {
                    new_enrolled_count: outcome.new_enrolled_count,
                    promoted: outcome.promoted.map(EnrollmentResponse::from),
                },
                "Enrollment cancelled",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// DELETE /api/sessions/{session_id}/tokens
///
/// - `200 OK` once the active token is deactivated
/// - `403 Forbidden` unless the caller trains the session or is an admin
/// - `404 Not Found` if there is no active token
pub async fn revoke_token(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match AttendanceTokenService::revoke(state.db(), session_id, claims.sub).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success((), "Attendance token revoked")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
