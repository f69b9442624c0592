// ============================
// greenpoll-backend-lib/src/routes/poll_vote.rs
// ============================

//! Voting endpoints. Any logged-in user may vote on any poll.
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{logged_in_user, ok};
use crate::error::ServiceError;
use crate::services::{Poll, PollVote};
use crate::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/poll_vote", get(poll_vote))
        .route("/poll_unvote", get(poll_unvote))
        .route("/get_poll_vote_poll", get(get_poll_vote_poll))
        .route("/get_user_vote", get(get_user_vote))
}

#[derive(Debug, Deserialize)]
struct VoteParams {
    poll_option_id: i64,
}

async fn poll_vote(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<VoteParams>,
) -> Result<Json<PollVote>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    let vote = state
        .services
        .poll_votes
        .vote(user.id, params.poll_option_id)
        .await?;
    Ok(Json(vote))
}

#[derive(Debug, Deserialize)]
struct UnvoteParams {
    poll_id: i64,
}

async fn poll_unvote(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<UnvoteParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    state
        .services
        .poll_votes
        .unvote(user.id, params.poll_id)
        .await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct VotePollParams {
    poll_vote_id: i64,
}

async fn get_poll_vote_poll(
    State(state): State<AppState>,
    Query(params): Query<VotePollParams>,
) -> Result<Json<Poll>, ServiceError> {
    Ok(Json(
        state
            .services
            .poll_votes
            .get_poll_vote_poll(params.poll_vote_id)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct UserVoteParams {
    poll_id: i64,
}

async fn get_user_vote(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<UserVoteParams>,
) -> Result<Json<PollVote>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    Ok(Json(
        state
            .services
            .poll_votes
            .get_poll_vote(user.id, params.poll_id)
            .await?,
    ))
}
