use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use db::models::token_scan::ScanKind;
use serde::Deserialize;
use services::attendance_token::{AttendanceTokenService, ScanRequest};
use util::state::AppState;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{service_error, validation_error};
use crate::response::ApiResponse;
use crate::routes::common::{AttendanceRecordResponse, notifier};

#[derive(Debug, Deserialize, Validate)]
pub struct ScanReq {
    #[validate(length(min = 1, max = 128, message = "token must be 1-128 characters"))]
    pub token: String,
    pub kind: ScanKind,
    #[validate(length(max = 200, message = "location must be at most 200 characters"))]
    pub location: Option<String>,
}

/// POST /api/attendance/scan
///
/// Records a check-in or check-out for the caller against a session token.
///
/// ### Request Body
/// ```json
/// { "token": "9f2c…", "kind": "check_in", "location": "front desk" }
/// ```
///
/// ### Responses
/// - `200 OK` with the caller's attendance record for today
/// - `400 Bad Request` if the token does not accept this kind of scan
/// - `404 Not Found` for an unknown or retired token
/// - `409 Conflict` when the caller is not enrolled, already scanned this kind, or the token is used up
/// - `410 Gone` when the token expired or the session does not run today
pub async fn scan_token(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<ScanReq>,
) -> Response {
    if let Err(e) = req.validate() {
        return validation_error(&e);
    }

    let request = ScanRequest {
        token: req.token,
        member_id: claims.sub,
        kind: req.kind,
        location: req.location,
    };

    match AttendanceTokenService::scan(state.db(), &notifier(&state), request, Utc::now()).await {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                AttendanceRecordResponse::from(record),
                "Scan recorded",
            )),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
