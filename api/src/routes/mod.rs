//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness probe (public)
//! - `/sessions` → schedule, enrollments, attendance tokens and records (authenticated)
//! - `/attendance` → token scans and statistics (authenticated)
//! - `/me` → the caller's enrollments (authenticated)

use crate::auth::guards::allow_authenticated;
use crate::routes::{
    attendance::attendance_routes, health::health_routes, me::me_routes,
    sessions::sessions_routes,
};
use axum::{Router, middleware::from_fn_with_state};
use util::state::AppState;

pub mod attendance;
pub mod common;
pub mod health;
pub mod me;
pub mod sessions;

/// Builds the complete application router for all HTTP endpoints.
///
/// `allow_authenticated` resolves the caller in the user directory, so the
/// `admin` flag every later guard and handler sees is the stored role rather
/// than the token's claim. Role checks that depend on the session (its
/// trainer) run in route layers or inside the engines; admin-only operations
/// are gated by `allow_admin`.
pub fn routes(app_state: AppState) -> Router {
    let authenticated = || from_fn_with_state(app_state.clone(), allow_authenticated);

    Router::new()
        .nest("/health", health_routes())
        .nest(
            "/sessions",
            sessions_routes(app_state.clone()).route_layer(authenticated()),
        )
        .nest("/attendance", attendance_routes().route_layer(authenticated()))
        .nest("/me", me_routes().route_layer(authenticated()))
        .with_state(app_state)
}
