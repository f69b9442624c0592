// ============================
// greenpoll-backend-lib/src/routes/poll_option.rs
// ============================

//! Poll option endpoints. Mutations require ownership of the parent
//! poll, resolved through the option.
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{logged_in_user, ok, owned_poll};
use crate::error::ServiceError;
use crate::services::{Poll, PollOption};
use crate::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/create_poll_option", get(create_poll_option))
        .route("/get_poll_option_info", get(get_poll_option_info))
        .route("/get_poll_option_poll", get(get_poll_option_poll))
        .route("/set_poll_option_value", get(set_poll_option_value))
        .route("/delete_poll_option", get(delete_poll_option))
}

#[derive(Debug, Deserialize)]
struct CreateOptionParams {
    poll_id: i64,
    value: String,
}

async fn create_poll_option(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CreateOptionParams>,
) -> Result<Json<PollOption>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    owned_poll(&state, &user, params.poll_id).await?;
    let option = state
        .services
        .poll_options
        .create_poll_option(params.poll_id, &params.value)
        .await?;
    Ok(Json(option))
}

#[derive(Debug, Deserialize)]
struct OptionParams {
    poll_option_id: i64,
}

async fn get_poll_option_info(
    State(state): State<AppState>,
    Query(params): Query<OptionParams>,
) -> Result<Json<PollOption>, ServiceError> {
    Ok(Json(
        state
            .services
            .poll_options
            .get_poll_option(params.poll_option_id)
            .await?,
    ))
}

async fn get_poll_option_poll(
    State(state): State<AppState>,
    Query(params): Query<OptionParams>,
) -> Result<Json<Poll>, ServiceError> {
    Ok(Json(
        state
            .services
            .poll_options
            .get_poll_option_poll(params.poll_option_id)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct SetValueParams {
    poll_option_id: i64,
    value: String,
}

async fn set_poll_option_value(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<SetValueParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    let poll = state
        .services
        .poll_options
        .get_poll_option_poll(params.poll_option_id)
        .await?;
    owned_poll(&state, &user, poll.id).await?;
    state
        .services
        .poll_options
        .set_poll_option_value(params.poll_option_id, &params.value)
        .await?;
    Ok(ok())
}

async fn delete_poll_option(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<OptionParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let user = logged_in_user(&state, &jar).await?;
    let poll = state
        .services
        .poll_options
        .get_poll_option_poll(params.poll_option_id)
        .await?;
    owned_poll(&state, &user, poll.id).await?;
    state
        .services
        .poll_options
        .delete_poll_option(params.poll_option_id)
        .await?;
    Ok(ok())
}
