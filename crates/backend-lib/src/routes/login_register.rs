// ============================
// greenpoll-backend-lib/src/routes/login_register.rs
// ============================

//! Registration and session endpoints.
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use tracing::info;

use super::{logged_in_user, ok, SESSION_COOKIE};
use crate::error::ServiceError;
use crate::notifier::EmailTemplate;
use crate::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register))
        .route("/login", get(login))
        .route("/logout", get(logout))
        .route("/logout_everywhere", get(logout_everywhere))
}

#[derive(Debug, Deserialize)]
struct RegisterParams {
    username: String,
    email: String,
    password: String,
}

/// Creates an account and emails a verification link. The account
/// stays unverified, and is removed, if the link is not followed
/// within the token TTL.
async fn register(
    State(state): State<AppState>,
    Query(params): Query<RegisterParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .create_user(&params.username, &params.email, &params.password)
        .await?;
    info!(user_id = user.id, username = %user.username, "user registered");

    let token = state.services.verifications.create(&user.email).await?;
    state.pruner.schedule_verification(&token);
    state
        .notifier
        .send(
            &user.email,
            EmailTemplate::VerifyAccount {
                app_url: state.settings.app_url.clone(),
                verify_id: token.id,
            },
        )
        .await;

    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct LoginParams {
    email: String,
    password: String,
}

/// Checks credentials and sets the session cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<LoginParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .users
        .login(&params.email, &params.password)
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, session.id))
        .path("/")
        .http_only(true)
        .build();
    Ok((jar.add(cookie), ok()))
}

/// Ends the current session and clears the cookie.
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state
            .services
            .sessions
            .delete_session(cookie.value())
            .await?;
    }
    Ok((jar.remove(Cookie::from(SESSION_COOKIE)), ok()))
}

/// Ends every session belonging to the current user.
async fn logout_everywhere(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    state.services.sessions.delete_user_sessions(user.id).await?;
    Ok((jar.remove(Cookie::from(SESSION_COOKIE)), ok()))
}
