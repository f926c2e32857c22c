//! `/api/attendance`: scanning a session token and attendance statistics.

use axum::{
    Router,
    routing::{get, post},
};
use util::state::AppState;

mod get;
mod post;

pub use get::attendance_stats;
pub use post::scan_token;

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/scan", post(scan_token))
        .route("/stats", get(attendance_stats))
}
