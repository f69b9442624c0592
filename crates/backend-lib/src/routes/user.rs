// ============================
// greenpoll-backend-lib/src/routes/user.rs
// ============================

//! User profile endpoints. Responses never include the password hash.
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::{logged_in_user, ok};
use crate::error::ServiceError;
use crate::services::{Poll, User};
use crate::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/get_user_info", get(get_user_info))
        .route("/get_specific_user_info", get(get_specific_user_info))
        .route("/set_username", get(set_username))
        .route("/set_password", get(set_password))
        .route("/get_user_polls", get(get_user_polls))
        .route("/get_user_vote_polls", get(get_user_vote_polls))
}

/// The current user's own profile.
#[derive(Debug, Serialize)]
struct UserInfo {
    id: i64,
    username: String,
    email: String,
    verified: bool,
    join_time: i64,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            verified: user.verified,
            join_time: user.join_time,
        }
    }
}

/// Another user's profile; the email stays private.
#[derive(Debug, Serialize)]
struct PublicUserInfo {
    id: i64,
    username: String,
    join_time: i64,
}

impl From<User> for PublicUserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            join_time: user.join_time,
        }
    }
}

async fn get_user_info(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<UserInfo>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
struct SpecificUserParams {
    user_id: i64,
}

async fn get_specific_user_info(
    State(state): State<AppState>,
    Query(params): Query<SpecificUserParams>,
) -> Result<Json<PublicUserInfo>, ServiceError> {
    let user = state.services.users.get_user(params.user_id).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
struct SetUsernameParams {
    new_username: String,
}

async fn set_username(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<SetUsernameParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    state
        .services
        .users
        .set_username(user.id, &params.new_username)
        .await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct SetPasswordParams {
    new_password: String,
}

async fn set_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<SetPasswordParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    state
        .services
        .users
        .set_password(user.id, &params.new_password)
        .await?;
    Ok(ok())
}

async fn get_user_polls(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<Poll>>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    Ok(Json(state.services.users.get_user_polls(user.id).await?))
}

async fn get_user_vote_polls(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<Poll>>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    Ok(Json(
        state.services.users.get_user_vote_polls(user.id).await?,
    ))
}
