use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::attendance_ledger::{AttendanceLedger, ManualMark};
use services::session_registry::{Reschedule, SessionRegistry};
use util::state::AppState;
use validator::Validate;

use super::common::{EditSessionReq, EditSessionResponse, MarkAttendanceReq};
use crate::auth::AuthUser;
use crate::error::{bad_request, service_error, validation_error};
use crate::response::ApiResponse;
use crate::routes::common::{AttendanceRecordResponse, EnrollmentResponse, SessionResponse, notifier};

/// PUT /api/sessions/{session_id}
///
/// Reschedules the session and/or changes its capacity. Admin only.
///
/// Schedule fields and `capacity` are applied in one transaction, so a
/// rejected capacity leaves the schedule untouched too. Growing capacity
/// promotes waitlisted members.
///
/// ### Responses
/// - `200 OK` with `{ session, promoted }`
/// - `400 Bad Request` if nothing is given or the new window is invalid
/// - `409 Conflict` if `capacity` is below the seats already taken
/// - `410 Gone` if the session is closed
pub async fn edit_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(req): Json<EditSessionReq>,
) -> Response {
    if let Err(e) = req.validate() {
        return validation_error(&e);
    }

    let changes = Reschedule {
        trainer_id: req.trainer_id,
        title: req.title,
        location: req.location,
        starts_on: req.starts_on,
        ends_on: req.ends_on,
        start_time: req.start_time,
        end_time: req.end_time,
    };
    if changes.is_empty() && req.capacity.is_none() {
        return bad_request("Nothing to update");
    }

    let outcome = match SessionRegistry::edit(
        state.db(),
        &notifier(&state),
        session_id,
        changes,
        req.capacity,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => return service_error(e),
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            EditSessionResponse {
                session: SessionResponse::from(outcome.session),
                promoted: outcome
                    .promoted
                    .into_iter()
                    .map(EnrollmentResponse::from)
                    .collect(),
            },
            "Session updated",
        )),
    )
        .into_response()
}

/// PUT /api/sessions/{session_id}/attendance/{member_id}
///
/// Sets a member's attendance for one date by hand. The status then sticks
/// through later scans until the record is reopened with `"reopen": true`.
///
/// ### Request Body
/// ```json
/// { "date": "2025-03-10", "status": "excused", "notes": "Doctor's note" }
/// ```
///
/// ### Responses
/// - `200 OK` with the record
/// - `400 Bad Request` for a date the session does not run on, a missing status,
///   check-out before check-in, or notes over 1000 characters
/// - `403 Forbidden` unless the caller trains the session or is an admin
pub async fn mark_attendance(
    State(state): State<AppState>,
    Path((session_id, member_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<MarkAttendanceReq>,
) -> Response {
    if let Err(e) = req.validate() {
        return validation_error(&e);
    }

    let mark = ManualMark {
        date: req.date,
        status: req.status,
        check_in_at: req.check_in_at,
        check_out_at: req.check_out_at,
        notes: req.notes,
        reopen: req.reopen,
    };

    match AttendanceLedger::mark_manually(
        state.db(),
        &notifier(&state),
        session_id,
        member_id,
        claims.sub,
        mark,
    )
    .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                AttendanceRecordResponse::from(record),
                "Attendance marked",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
