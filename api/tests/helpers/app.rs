use api::{routes::routes, ws::ws_routes};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
    response::Response,
};
use chrono::{NaiveTime, Utc};
use db::models::session::{Model as SessionModel, NewSession};
use db::models::user::{Model as UserModel, UserRole};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Once;
use tower::ServiceExt;
use tower::util::BoxCloneService;
use util::{state::AppState, ws::WebSocketManager};

static INIT: Once = Once::new();

/// Config is read once per process; make sure the secret exists before that.
fn init_env() {
    INIT.call_once(|| unsafe {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    });
}

pub fn make_test_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes(state.clone()))
        .nest("/ws", ws_routes(state))
}

pub async fn make_test_app() -> (
    BoxCloneService<Request<Body>, Response, Infallible>,
    AppState,
) {
    init_env();
    let state = AppState::new(setup_test_db().await, WebSocketManager::new());
    let app = make_test_router(state.clone()).into_service().boxed_clone();
    (app, state)
}

/// Sends one request and returns the status with the decoded envelope.
pub async fn send(
    app: &BoxCloneService<Request<Body>, Response, Infallible>,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn user(db: &DatabaseConnection, name: &str, role: UserRole) -> UserModel {
    UserModel::create(db, name, &format!("{name}@gym.test"), name, role)
        .await
        .unwrap()
}

pub fn token_for(user: &UserModel) -> String {
    api::auth::generate_jwt(user.id, user.is_admin()).0
}

/// A session running all of today, so scans made now fall inside it.
pub async fn session_today(
    db: &DatabaseConnection,
    trainer_id: i64,
    capacity: i32,
) -> SessionModel {
    let today = Utc::now().date_naive();
    SessionModel::create(
        db,
        NewSession {
            trainer_id,
            title: "Open gym".into(),
            location: Some("Main floor".into()),
            starts_on: today,
            ends_on: today,
            start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            capacity,
        },
    )
    .await
    .unwrap()
}
