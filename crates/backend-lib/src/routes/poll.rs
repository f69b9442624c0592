// ============================
// greenpoll-backend-lib/src/routes/poll.rs
// ============================

//! Poll endpoints. Reads are public; mutations require ownership.
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{logged_in_user, ok, owned_poll};
use crate::error::ServiceError;
use crate::services::{Poll, PollOption, PollVote, PollVoter};
use crate::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/create_poll", get(create_poll))
        .route("/get_poll_info", get(get_poll_info))
        .route("/get_poll_options", get(get_poll_options))
        .route("/get_poll_votes", get(get_poll_votes))
        .route("/get_poll_voters", get(get_poll_voters))
        .route("/set_poll_title", get(set_poll_title))
        .route("/set_poll_description", get(set_poll_description))
        .route("/delete_poll", get(delete_poll))
}

#[derive(Debug, Deserialize)]
struct CreatePollParams {
    title: String,
    #[serde(default)]
    description: String,
}

async fn create_poll(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CreatePollParams>,
) -> Result<Json<Poll>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    let poll = state
        .services
        .polls
        .create_poll(user.id, &params.title, &params.description)
        .await?;
    Ok(Json(poll))
}

#[derive(Debug, Deserialize)]
struct PollParams {
    poll_id: i64,
}

async fn get_poll_info(
    State(state): State<AppState>,
    Query(params): Query<PollParams>,
) -> Result<Json<Poll>, ServiceError> {
    Ok(Json(state.services.polls.get_poll(params.poll_id).await?))
}

async fn get_poll_options(
    State(state): State<AppState>,
    Query(params): Query<PollParams>,
) -> Result<Json<Vec<PollOption>>, ServiceError> {
    Ok(Json(
        state.services.polls.get_poll_options(params.poll_id).await?,
    ))
}

async fn get_poll_votes(
    State(state): State<AppState>,
    Query(params): Query<PollParams>,
) -> Result<Json<Vec<PollVote>>, ServiceError> {
    Ok(Json(
        state.services.polls.get_poll_votes(params.poll_id).await?,
    ))
}

async fn get_poll_voters(
    State(state): State<AppState>,
    Query(params): Query<PollParams>,
) -> Result<Json<Vec<PollVoter>>, ServiceError> {
    Ok(Json(
        state.services.polls.get_poll_voters(params.poll_id).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct SetTitleParams {
    poll_id: i64,
    title: String,
}

async fn set_poll_title(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<SetTitleParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    owned_poll(&state, &user, params.poll_id).await?;
    state
        .services
        .polls
        .set_title(params.poll_id, &params.title)
        .await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct SetDescriptionParams {
    poll_id: i64,
    description: String,
}

async fn set_poll_description(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<SetDescriptionParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    owned_poll(&state, &user, params.poll_id).await?;
    state
        .services
        .polls
        .set_description(params.poll_id, &params.description)
        .await?;
    Ok(ok())
}

async fn delete_poll(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<PollParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    owned_poll(&state, &user, params.poll_id).await?;
    state.services.polls.delete_poll(params.poll_id).await?;
    Ok(ok())
}
