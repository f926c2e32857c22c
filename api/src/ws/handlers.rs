use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
};
use util::state::AppState;
use util::ws::serve::{WsServerOptions, serve_topic};

/// GET /ws/sessions/{session_id}
///
/// Upgrades to a listen-only socket on `sessions:{session_id}`. Access is
/// checked by `allow_session_ws_access` before the upgrade.
pub async fn session_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Path(session_id): Path<i64>,
) -> impl IntoResponse {
    let manager = app_state.ws_clone();
    let topic = format!("sessions:{session_id}");
    ws.on_upgrade(move |socket| serve_topic(socket, manager, topic, WsServerOptions::default()))
}
