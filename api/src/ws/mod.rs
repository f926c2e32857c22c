use axum::{Router, middleware::from_fn_with_state, routing::get};
use util::state::AppState;

use crate::auth::guards::allow_session_ws_access;

pub mod handlers;
pub mod notifier;

pub use notifier::WsNotifier;

/// `/ws/sessions/{session_id}`: streams the `sessions:{id}` topic.
pub fn ws_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/sessions/{session_id}",
            get(handlers::session_ws_handler).route_layer(from_fn_with_state(
                app_state.clone(),
                allow_session_ws_access,
            )),
        )
        .with_state(app_state)
}
