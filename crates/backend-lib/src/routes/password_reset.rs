// ============================
// greenpoll-backend-lib/src/routes/password_reset.rs
// ============================

//! Password reset endpoints.
//!
//! Requesting a reset succeeds whether or not the email has an
//! account, so the endpoint cannot be used to probe for registered
//! addresses. A token is only created, and an email only sent, when
//! the account exists.
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::ok;
use crate::error::ServiceError;
use crate::notifier::EmailTemplate;
use crate::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/request_password_reset", get(request_password_reset))
        .route("/password_reset_exists", get(password_reset_exists))
        .route("/reset_password", get(reset_password))
}

#[derive(Debug, Deserialize)]
struct RequestResetParams {
    email: String,
}

async fn request_password_reset(
    State(state): State<AppState>,
    Query(params): Query<RequestResetParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    if state
        .services
        .users
        .user_exists_for_email(&params.email)
        .await?
    {
        let token = state.services.password_resets.create(&params.email).await?;
        state.pruner.schedule_password_reset(&token);
        state
            .notifier
            .send(
                &params.email,
                EmailTemplate::PasswordReset {
                    app_url: state.settings.app_url.clone(),
                    reset_id: token.id,
                },
            )
            .await;
    }
    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct ResetExistsParams {
    reset_id: String,
}

async fn password_reset_exists(
    State(state): State<AppState>,
    Query(params): Query<ResetExistsParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let exists = state
        .services
        .password_resets
        .ledger()
        .exists(&params.reset_id)
        .await?;
    Ok(Json(json!({ "exists": exists })))
}

#[derive(Debug, Deserialize)]
struct ResetPasswordParams {
    reset_id: String,
    new_password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    Query(params): Query<ResetPasswordParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state
        .services
        .password_resets
        .redeem(&params.reset_id, &params.new_password)
        .await?;
    Ok(ok())
}
