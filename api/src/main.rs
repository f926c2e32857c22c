use api::auth::middleware::log_request;
use api::routes::routes;
use api::ws::ws_routes;
use axum::{Router, middleware::from_fn};
use chrono::Utc;
use services::attendance_token::AttendanceTokenService;
use std::{net::SocketAddr, time::Duration};
use tower_http::cors::CorsLayer;
use tracing_appender::rolling;
use util::config::AppConfig;
use util::{state::AppState, ws::WebSocketManager};

#[tokio::main]
async fn main() {
    let config = AppConfig::global().clone();
    let _log_guard = init_logging(&config.log_file, &config.log_level, config.log_to_stdout);

    let db = db::connect().await.expect("Failed to connect to database");
    let app_state = AppState::new(db, WebSocketManager::new());

    spawn_token_sweeper(app_state.clone(), config.token_sweep_interval_seconds);

    let cors = CorsLayer::very_permissive();

    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .nest("/ws", ws_routes(app_state.clone()))
        .layer(from_fn(log_request))
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    tracing::info!(
        project = %config.project_name,
        env = %config.env,
        %addr,
        "Starting server"
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}

fn init_logging(
    log_file: &str,
    log_level: &str,
    log_to_stdout: bool,
) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = log_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(true)
    });

    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("api=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

/// Expired tokens are already refused on scan; the sweep only flips their
/// `active` flag so listings stay accurate.
fn spawn_token_sweeper(app_state: AppState, interval_secs: u64) {
    let db = app_state.db_clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = AttendanceTokenService::sweep_expired(&db, Utc::now()).await {
                tracing::warn!(error = %e, "Token sweep failed");
            }
        }
    });
}
