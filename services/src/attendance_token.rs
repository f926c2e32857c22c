//! Short-lived attendance tokens: issuance, scanning and expiry.
//!
//! A scan is checked and applied under the token's lock and the record's lock,
//! inside one transaction: the scan event, the usage increment and the ledger
//! upsert commit together or not at all.

use crate::ServiceResult;
use crate::attendance_ledger;
use crate::directory;
use crate::error::ServiceError;
use crate::locks::{RECORD_LOCKS, SESSION_LOCKS, TOKEN_LOCKS};
use crate::notifier::{Notifier, SessionEvent};
use crate::retry::with_retry;
use crate::session_registry::find_session;
use chrono::{DateTime, Duration, Utc};
use db::models::attendance_record::Model as AttendanceRecord;
use db::models::attendance_token::{
    Entity as TokenEntity, Model as AttendanceToken, NewToken, TokenSessionType,
};
use db::models::enrollment::Model as Enrollment;
use db::models::token_scan::{Model as TokenScan, ScanKind};
use sea_orm::{DatabaseConnection, EntityTrait, SqlErr, TransactionTrait};
use util::config::AppConfig;

/// Bounds applied to issuance requests.
#[derive(Debug, Clone, Copy)]
pub struct TokenLimits {
    pub default_ttl_seconds: i64,
    pub max_ttl_seconds: i64,
}

impl Default for TokenLimits {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 900,
            max_ttl_seconds: 4 * 60 * 60,
        }
    }
}

impl TokenLimits {
    pub fn from_config() -> Self {
        let config = AppConfig::global();
        Self {
            default_ttl_seconds: config.token_default_ttl_seconds,
            max_ttl_seconds: config.token_max_ttl_seconds,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IssueToken {
    /// Defaults to accepting both check-in and check-out.
    pub session_type: Option<TokenSessionType>,
    pub ttl_seconds: Option<i64>,
    /// Defaults to one use per seat per accepted scan kind.
    pub max_usage: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub token: String,
    pub member_id: i64,
    pub kind: ScanKind,
    pub location: Option<String>,
}

pub struct AttendanceTokenService;

impl AttendanceTokenService {
    /// Returns the session's current token while it is still usable, otherwise
    /// retires it and mints a fresh one.
    pub async fn issue(
        db: &DatabaseConnection,
        session_id: i64,
        issuer_id: i64,
        params: IssueToken,
        limits: TokenLimits,
        now: DateTime<Utc>,
    ) -> ServiceResult<AttendanceToken> {
        let session = find_session(db, session_id).await?;
        directory::require_manager(db, issuer_id, &session).await?;

        let ttl = params.ttl_seconds.unwrap_or(limits.default_ttl_seconds);
        if ttl <= 0 {
            return Err(ServiceError::Invalid("ttl_seconds must be positive".into()));
        }
        if ttl > limits.max_ttl_seconds {
            return Err(ServiceError::Invalid(format!(
                "ttl_seconds must not exceed {}",
                limits.max_ttl_seconds
            )));
        }
        if matches!(params.max_usage, Some(n) if n <= 0) {
            return Err(ServiceError::Invalid("max_usage must be positive".into()));
        }

        let _guard = SESSION_LOCKS.lock(session_id).await;
        let request = Issue {
            session_id,
            issuer_id,
            session_type: params.session_type.unwrap_or(TokenSessionType::Both),
            ttl: Duration::seconds(ttl),
            max_usage: params.max_usage,
            now,
        };
        let request = &request;
        let token = with_retry("token.issue", || issue_txn(db, request)).await?;

        tracing::info!(
            session_id,
            token_id = token.id,
            issued_by = token.issued_by,
            expires_at = %token.expires_at,
            max_usage = token.max_usage,
            "Attendance token ready"
        );
        Ok(token)
    }

    /// Deactivates the session's active token.
    pub async fn revoke(
        db: &DatabaseConnection,
        session_id: i64,
        actor_id: i64,
    ) -> ServiceResult<()> {
        let session = find_session(db, session_id).await?;
        directory::require_manager(db, actor_id, &session).await?;

        let _guard = SESSION_LOCKS.lock(session_id).await;
        let revoked = AttendanceToken::deactivate_for_session(db, session_id).await?;
        if revoked == 0 {
            return Err(ServiceError::NotFound(format!(
                "active token for session {session_id}"
            )));
        }
        tracing::info!(session_id, revoked_by = actor_id, "Attendance token revoked");
        Ok(())
    }

    /// Records a scan and returns the member's updated attendance record.
    pub async fn scan(
        db: &DatabaseConnection,
        notifier: &dyn Notifier,
        request: ScanRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<AttendanceRecord> {
        let token = AttendanceToken::find_by_value(db, &request.token)
            .await?
            .filter(|t| t.active)
            .ok_or_else(|| ServiceError::NotFound("attendance token".into()))?;
        directory::active_user(db, request.member_id).await?;

        let _token_guard = TOKEN_LOCKS.lock(token.id).await;
        let _record_guard = RECORD_LOCKS
            .lock((request.member_id, token.session_id, now.date_naive()))
            .await;

        let request = &request;
        let outcome = with_retry("token.scan", || scan_txn(db, token.id, request, now)).await;

        let record = match outcome {
            Ok(record) => record,
            Err(ServiceError::Expired(what)) => {
                AttendanceToken::deactivate(db, token.id).await?;
                tracing::debug!(token_id = token.id, "Deactivated expired token on scan");
                return Err(ServiceError::Expired(what));
            }
            Err(err) => {
                tracing::debug!(
                    token_id = token.id,
                    member_id = request.member_id,
                    kind = %request.kind,
                    error = %err,
                    "Scan rejected"
                );
                return Err(err);
            }
        };

        tracing::info!(
            token_id = token.id,
            session_id = record.session_id,
            member_id = record.member_id,
            kind = %request.kind,
            status = %record.status,
            "Scan recorded"
        );
        notifier
            .notify(SessionEvent::AttendanceRecorded {
                record: record.clone(),
            })
            .await;
        Ok(record)
    }

    /// Deactivates every active token whose expiry has passed.
    pub async fn sweep_expired(db: &DatabaseConnection, now: DateTime<Utc>) -> ServiceResult<u64> {
        let swept = with_retry("token.sweep", || deactivate_expired(db, now)).await?;
        if swept > 0 {
            tracing::info!(swept, "Expired attendance tokens deactivated");
        }
        Ok(swept)
    }
}

struct Issue {
    session_id: i64,
    issuer_id: i64,
    session_type: TokenSessionType,
    ttl: Duration,
    max_usage: Option<i32>,
    now: DateTime<Utc>,
}

async fn issue_txn(db: &DatabaseConnection, req: &Issue) -> ServiceResult<AttendanceToken> {
    let txn = db.begin().await?;

    let session = find_session(&txn, req.session_id).await?;
    if !session.active {
        return Err(ServiceError::Inactive(format!("session {}", req.session_id)));
    }

    if let Some(current) = AttendanceToken::find_active_for_session(&txn, req.session_id).await? {
        if current.is_valid_for_scanning(req.now) {
            return Ok(current);
        }
        AttendanceToken::deactivate(&txn, current.id).await?;
    }

    let created = AttendanceToken::create(
        &txn,
        NewToken {
            session_id: req.session_id,
            issued_by: req.issuer_id,
            session_type: req.session_type,
            expires_at: req.now + req.ttl,
            max_usage: req
                .max_usage
                .unwrap_or(session.capacity * req.session_type.kind_count()),
        },
    )
    .await;
    let token = match created {
        Ok(token) => token,
        // Another issuer committed first; theirs is the session's token now.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            AttendanceToken::find_active_for_session(&txn, req.session_id)
                .await?
                .ok_or(ServiceError::from(e))?
        }
        Err(e) => return Err(e.into()),
    };

    txn.commit().await?;
    Ok(token)
}

async fn scan_txn(
    db: &DatabaseConnection,
    token_id: i64,
    req: &ScanRequest,
    now: DateTime<Utc>,
) -> ServiceResult<AttendanceRecord> {
    let txn = db.begin().await?;

    let token = TokenEntity::find_by_id(token_id)
        .one(&txn)
        .await?
        .filter(|t| t.active)
        .ok_or_else(|| ServiceError::NotFound("attendance token".into()))?;
    if token.is_expired(now) {
        return Err(ServiceError::Expired("attendance token".into()));
    }
    if token.is_exhausted() {
        return Err(ServiceError::UsageExceeded {
            usage_count: token.usage_count,
            max_usage: token.max_usage,
        });
    }
    if !token.session_type.permits(req.kind) {
        return Err(ServiceError::Invalid(format!(
            "token does not accept {} scans",
            req.kind
        )));
    }

    let session = find_session(&txn, token.session_id).await?;
    if !session.active || !session.is_scheduled_on(now.date_naive()) {
        return Err(ServiceError::Inactive(format!(
            "session {} for {}",
            session.id,
            now.date_naive()
        )));
    }
    if !Enrollment::is_enrolled(&txn, session.id, req.member_id).await? {
        return Err(ServiceError::NotEnrolled {
            session_id: session.id,
            member_id: req.member_id,
        });
    }

    if TokenScan::exists(&txn, token.id, req.member_id, req.kind).await? {
        return Err(ServiceError::DuplicateScan {
            member_id: req.member_id,
            kind: req.kind,
        });
    }
    TokenScan::create(&txn, token.id, req.member_id, req.kind, req.location.clone(), now)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::DuplicateScan {
                member_id: req.member_id,
                kind: req.kind,
            },
            _ => ServiceError::from(e),
        })?;

    if !AttendanceToken::try_consume(&txn, token.id).await? {
        return Err(ServiceError::UsageExceeded {
            usage_count: token.max_usage,
            max_usage: token.max_usage,
        });
    }

    let record = attendance_ledger::record_scan(
        &txn,
        &session,
        req.member_id,
        req.kind,
        now,
        req.location.clone(),
    )
    .await?;

    txn.commit().await?;
    Ok(record)
}

async fn deactivate_expired(db: &DatabaseConnection, now: DateTime<Utc>) -> ServiceResult<u64> {
    Ok(AttendanceToken::deactivate_expired(db, now).await?)
}
