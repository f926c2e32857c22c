//! Lookups against the member/trainer directory.
//!
//! The directory is owned elsewhere; these helpers only read it and turn
//! missing or disabled accounts into typed errors.

use crate::ServiceResult;
use crate::error::ServiceError;
use db::models::session::Model as Session;
use db::models::user::{Entity as UserEntity, Model as User};
use sea_orm::{ConnectionTrait, EntityTrait};

/// Any known, active account.
pub async fn active_user<C: ConnectionTrait>(db: &C, user_id: i64) -> ServiceResult<User> {
    let user = UserEntity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("user", user_id))?;

    if !user.active {
        return Err(ServiceError::Inactive(format!("user {user_id}")));
    }
    Ok(user)
}

/// An active account allowed to run sessions (trainer or admin).
pub async fn active_staff<C: ConnectionTrait>(db: &C, user_id: i64) -> ServiceResult<User> {
    let user = active_user(db, user_id).await?;
    if !user.is_staff() {
        return Err(ServiceError::Invalid(format!(
            "user {user_id} is not a trainer"
        )));
    }
    Ok(user)
}

/// Trainer of the session or an admin.
pub fn can_manage(user: &User, session: &Session) -> bool {
    user.is_admin() || user.id == session.trainer_id
}

/// Resolves `actor_id` and checks it may manage `session`.
pub async fn require_manager<C: ConnectionTrait>(
    db: &C,
    actor_id: i64,
    session: &Session,
) -> ServiceResult<User> {
    let actor = active_user(db, actor_id).await?;
    if !can_manage(&actor, session) {
        return Err(ServiceError::Forbidden(format!(
            "user {actor_id} does not run session {}",
            session.id
        )));
    }
    Ok(actor)
}
