// ============================
// greenpoll-backend-lib/src/routes/mod.rs
// ============================

//! HTTP routing layer.
//!
//! Thin handlers over the domain services: parse query parameters,
//! resolve the current user from the session cookie, enforce ownership,
//! and hand off. All business rules live below this layer.

mod login_register;
mod password_reset;
mod poll;
mod poll_option;
mod poll_vote;
mod user;
mod verify;

use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ServiceError;
use crate::services::{Poll, User};
use crate::AppState;

/// Name of the session bearer cookie.
pub const SESSION_COOKIE: &str = "session_id";

/// Builds the full application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(login_register::router())
        .merge(user::router())
        .merge(verify::router())
        .merge(password_reset::router())
        .merge(poll::router())
        .merge(poll_option::router())
        .merge(poll_vote::router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Empty success body.
pub(crate) fn ok() -> Json<Value> {
    Json(json!({}))
}

/// Resolves the current user from the session cookie. A missing or
/// stale cookie is reported as an invalid token, not as a lookup
/// failure.
pub(crate) async fn logged_in_user(
    state: &AppState,
    jar: &CookieJar,
) -> Result<User, ServiceError> {
    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ServiceError::InvalidToken)?;
    state
        .services
        .sessions
        .get_user_by_session_id(&session_id)
        .await
        .map_err(|e| match e {
            ServiceError::NotFound(_) => ServiceError::InvalidToken,
            other => other,
        })
}

/// Fetches a poll and checks that the current user owns it.
pub(crate) async fn owned_poll(
    state: &AppState,
    user: &User,
    poll_id: i64,
) -> Result<Poll, ServiceError> {
    let poll = state.services.polls.get_poll(poll_id).await?;
    if poll.user_id != user.id {
        return Err(ServiceError::PermissionDenied);
    }
    Ok(poll)
}
