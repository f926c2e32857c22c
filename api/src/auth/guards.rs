use crate::auth::claims::AuthUser;
use crate::auth::extractors::decode_claims;
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, Query, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::enrollment::Model as Enrollment;
use db::models::session::{Entity as SessionEntity, Model as Session};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Deserialize;
use services::directory;
use services::error::ErrorKind;
use std::collections::HashMap;
use util::state::AppState;

type GuardError = (StatusCode, Json<ApiResponse<Empty>>);

#[derive(serde::Serialize, Default)]
pub struct Empty;

fn reject(status: StatusCode, message: &str) -> GuardError {
    (status, Json(ApiResponse::error(message)))
}

/// Helper to extract, validate user from request extensions and insert the back into the request.
/// A user already resolved by an outer guard is reused as is.
async fn extract_and_insert_authuser(
    mut req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), GuardError> {
    if let Some(user) = req.extensions().get::<AuthUser>().cloned() {
        return Ok((req, user));
    }

    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// The token names the caller; the directory decides whether the account is
/// still active and whether it is an admin.
async fn resolve_in_directory(
    db: &DatabaseConnection,
    mut req: Request<Body>,
    mut user: AuthUser,
) -> Result<(Request<Body>, AuthUser), GuardError> {
    match directory::active_user(db, user.0.sub).await {
        Ok(account) => {
            user.0.admin = account.is_admin();
            req.extensions_mut().insert(user.clone());
            Ok((req, user))
        }
        Err(e) if e.kind() == ErrorKind::Internal => {
            tracing::error!(error = %e, user_id = user.0.sub, "DB error while resolving caller");
            Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error while checking account",
            ))
        }
        Err(_) => Err(reject(StatusCode::UNAUTHORIZED, "Account is not active")),
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Browsers cannot set headers on a WebSocket handshake, so `?token=` is
/// accepted there as a fallback for the bearer header.
async fn extract_ws_authuser(
    mut req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), GuardError> {
    let from_query = Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.token)
        .and_then(|t| decode_claims(&t));

    match from_query {
        Some(claims) => {
            let user = AuthUser(claims);
            req.extensions_mut().insert(user.clone());
            Ok((req, user))
        }
        None => extract_and_insert_authuser(req).await,
    }
}

fn session_id_param(params: &HashMap<String, String>) -> Result<i64, GuardError> {
    params
        .get("session_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Missing or invalid session_id"))
}

async fn load_session(db: &DatabaseConnection, session_id: i64) -> Result<Session, GuardError> {
    SessionEntity::find_by_id(session_id)
        .one(db)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, session_id, "DB error while loading session");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error while checking session",
            )
        })?
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Session not found"))
}

/// Basic guard to ensure the request is authenticated by an active account.
pub async fn allow_authenticated(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardError> {
    let (req, user) = extract_and_insert_authuser(req).await?;
    let (req, _user) = resolve_in_directory(app_state.db(), req, user).await?;

    Ok(next.run(req).await)
}

/// Admin-only guard.
pub async fn allow_admin(req: Request<Body>, next: Next) -> Result<Response, GuardError> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if !user.0.admin {
        return Err(reject(StatusCode::FORBIDDEN, "Admin access required"));
    }

    Ok(next.run(req).await)
}

/// Admins and the trainer running the session in `{session_id}`.
pub async fn allow_session_staff(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardError> {
    let (req, user) = extract_and_insert_authuser(req).await?;
    let session = load_session(app_state.db(), session_id_param(&params)?).await?;

    if user.0.admin || session.trainer_id == user.0.sub {
        return Ok(next.run(req).await);
    }

    Err(reject(
        StatusCode::FORBIDDEN,
        "Only the session trainer or an admin may access this",
    ))
}

/// Session notifications are visible to staff and to members holding a place.
pub async fn allow_session_ws_access(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardError> {
    let db = app_state.db();
    let (req, user) = extract_ws_authuser(req).await?;
    let (req, user) = resolve_in_directory(db, req, user).await?;
    let session = load_session(db, session_id_param(&params)?).await?;

    if user.0.admin || session.trainer_id == user.0.sub {
        return Ok(next.run(req).await);
    }

    match Enrollment::find_active(db, session.id, user.0.sub).await {
        Ok(Some(_)) => Ok(next.run(req).await),
        Ok(None) => Err(reject(
            StatusCode::FORBIDDEN,
            "Not enrolled in this session",
        )),
        Err(e) => {
            tracing::warn!(
                error = %e,
                session_id = session.id,
                user_id = user.0.sub,
                "DB error while checking enrollment; denying access"
            );
            Err(reject(StatusCode::FORBIDDEN, "Not enrolled in this session"))
        }
    }
}
