use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use db::models::user::UserRole;
use serde::Deserialize;
use services::attendance_ledger::{AttendanceLedger, StatsFilter};
use services::directory;
use util::state::AppState;

use crate::auth::AuthUser;
use crate::error::{forbidden, service_error};
use crate::response::ApiResponse;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub session_id: Option<i64>,
    pub member_id: Option<i64>,
    pub trainer_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// GET /api/attendance/stats?session_id=&member_id=&trainer_id=&from=&to=
///
/// Counts per status plus `attendance_rate = (present + late) / (present + late + absent)`.
///
/// Scope depends on the caller: admins see everything, trainers only the
/// sessions they run, members only their own records.
///
/// ### Responses
/// - `200 OK`
/// - `400 Bad Request` if `from` is after `to`
/// - `403 Forbidden` when a member asks about someone else
pub async fn attendance_stats(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let db = state.db();

    let mut filter = StatsFilter {
        session_id: query.session_id,
        member_id: query.member_id,
        trainer_id: query.trainer_id,
        from: query.from,
        to: query.to,
    };

    if !claims.admin {
        let caller = match directory::active_user(db, claims.sub).await {
            Ok(user) => user,
            Err(e) => return service_error(e),
        };
        match caller.role {
            UserRole::Admin => {}
            UserRole::Trainer => filter.trainer_id = Some(caller.id),
            UserRole::Member => {
                if matches!(filter.member_id, Some(id) if id != caller.id) {
                    return forbidden("Members may only view their own attendance");
                }
                filter.member_id = Some(caller.id);
                filter.trainer_id = None;
            }
        }
    }

    match AttendanceLedger::stats(db, filter).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(ApiResponse::success(stats, "Attendance statistics retrieved")),
        )
            .into_response(),
        Err(e) => service_error(e),
    }
}
