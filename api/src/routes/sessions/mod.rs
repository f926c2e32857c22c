//! `/api/sessions`: the class schedule and everything hanging off a session.
//!
//! | Route | Access |
//! |---|---|
//! | `POST /` | admin |
//! | `GET /{session_id}` | authenticated |
//! | `PUT /{session_id}`, `DELETE /{session_id}` | admin |
//! | `GET /{session_id}/enrollments` | session trainer or admin |
//! | `POST /{session_id}/enrollments` | authenticated (self, or any member for admins) |
//! | `DELETE /{session_id}/enrollments/{member_id}` | the member or an admin |
//! | `POST`/`DELETE /{session_id}/tokens` | session trainer or admin (checked by the engine) |
//! | `GET /{session_id}/attendance` | session trainer or admin |
//! | `PUT /{session_id}/attendance/{member_id}` | session trainer or admin (checked by the ledger) |

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use util::state::AppState;

use crate::auth::guards::{allow_admin, allow_session_staff};

mod common;
mod delete;
mod get;
mod post;
mod put;

pub use delete::{cancel_enrollment, close_session, revoke_token};
pub use get::{get_session, list_enrollments, list_records};
pub use post::{create_session, enroll, issue_token};
pub use put::{edit_session, mark_attendance};

pub fn sessions_routes(app_state: AppState) -> Router<AppState> {
    let staff_only = from_fn_with_state(app_state.clone(), allow_session_staff);

    Router::new()
        .route("/", post(create_session).route_layer(from_fn(allow_admin)))
        .route(
            "/{session_id}",
            get(get_session).merge(
                put(edit_session)
                    .delete(close_session)
                    .route_layer(from_fn(allow_admin)),
            ),
        )
        .route(
            "/{session_id}/enrollments",
            get(list_enrollments)
                .route_layer(staff_only.clone())
                .merge(post(enroll)),
        )
        .route(
            "/{session_id}/enrollments/{member_id}",
            axum::routing::delete(cancel_enrollment),
        )
        .route("/{session_id}/tokens", post(issue_token).delete(revoke_token))
        .route(
            "/{session_id}/attendance",
            get(list_records).route_layer(staff_only),
        )
        .route("/{session_id}/attendance/{member_id}", put(mark_attendance))
        .with_state(app_state)
}
