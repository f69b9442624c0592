// ============================
// greenpoll-backend-lib/src/routes/verify.rs
// ============================

//! Account verification endpoint.
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::ok;
use crate::error::ServiceError;
use crate::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/verify_account", get(verify_account))
}

#[derive(Debug, Deserialize)]
struct VerifyParams {
    verify_id: String,
}

async fn verify_account(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.services.verifications.redeem(&params.verify_id).await?;
    info!("account verified");
    Ok(ok())
}
