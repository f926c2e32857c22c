use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::attendance_ledger::AttendanceLedger;
use services::enrollment::EnrollmentService;
use services::session_registry::SessionRegistry;
use util::state::AppState;

use super::common::RecordsQuery;
use crate::error::service_error;
use crate::response::ApiResponse;
use crate::routes::common::{AttendanceRecordResponse, EnrollmentResponse, SessionResponse};

/// GET /api/sessions/{session_id}
///
/// - `200 OK` with the session
/// - `404 Not Found`
pub async fn get_session(State(state): State<AppState>, Path(session_id): Path<i64>) -> Response {
    match SessionRegistry::get(state.db(), session_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                SessionResponse::from(session),
                "Session retrieved",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}

/// GET /api/sessions/{session_id}/enrollments
///
/// Enrolled members first, then the waitlist in position order.
pub async fn list_enrollments(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Response {
    match EnrollmentService::roster(state.db(), session_id).await {
        Ok(entries) => {
            let entries: Vec<EnrollmentResponse> =
                entries.into_iter().map(EnrollmentResponse::from).collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(entries, "Roster retrieved")),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}

/// GET /api/sessions/{session_id}/attendance?date=YYYY-MM-DD
pub async fn list_records(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Query(query): Query<RecordsQuery>,
) -> Response {
    match AttendanceLedger::session_records(state.db(), session_id, query.date).await {
        Ok(records) => {
            let records: Vec<AttendanceRecordResponse> = records
                .into_iter()
                .map(AttendanceRecordResponse::from)
                .collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(records, "Attendance records retrieved")),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}
