//! `/api/me`: the caller's own data.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use services::enrollment::EnrollmentService;
use util::state::AppState;

use crate::auth::AuthUser;
use crate::error::service_error;
use crate::response::ApiResponse;
use crate::routes::common::EnrollmentResponse;

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/enrollments", get(my_enrollments))
}

/// GET /api/me/enrollments
///
/// The caller's enrolled and waitlisted places across all sessions.
pub async fn my_enrollments(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Response {
    match EnrollmentService::member_enrollments(state.db(), claims.sub).await {
        Ok(entries) => {
            let entries: Vec<EnrollmentResponse> =
                entries.into_iter().map(EnrollmentResponse::from).collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(entries, "Enrollments retrieved")),
            )
                .into_response()
        }
        Err(e) => service_error(e),
    }
}
