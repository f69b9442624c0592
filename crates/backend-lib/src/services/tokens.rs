// ============================
// greenpoll-backend-lib/src/services/tokens.rs
// ============================

//! Short-lived, single-use tokens keyed by email.
//!
//! Verification and password-reset tokens have the same shape and the
//! same lifecycle, so one ledger serves both, parameterized by kind
//! and TTL. A token's TTL is anchored to its original creation time;
//! re-requesting a token never resets the clock.
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{exec, fetch_all, fetch_opt, user::User};
use crate::auth::generate_secure_token;
use crate::error::ServiceError;
use crate::metrics as metric_keys;
use crate::store::{RecordStore, StoreError};

/// Which token table a ledger operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Verification,
    PasswordReset,
}

impl TokenKind {
    /// Operation-name prefix for this kind's record family.
    pub fn prefix(self) -> &'static str {
        match self {
            TokenKind::Verification => "verify",
            TokenKind::PasswordReset => "password_reset",
        }
    }

    fn not_found(self) -> &'static str {
        match self {
            TokenKind::Verification => "Verification record does not exist",
            TokenKind::PasswordReset => "Password reset record does not exist",
        }
    }

    fn not_found_for_email(self) -> &'static str {
        match self {
            TokenKind::Verification => "Verification record does not exist for given email",
            TokenKind::PasswordReset => "Password reset record does not exist for given email",
        }
    }
}

/// A verification or password-reset token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub email: String,
    pub create_time: i64,
}

/// Generic token ledger, shared by the verification and password-reset
/// services.
#[derive(Clone)]
pub struct TokenLedger {
    store: Arc<dyn RecordStore>,
    kind: TokenKind,
    ttl: Duration,
}

impl TokenLedger {
    pub fn new(store: Arc<dyn RecordStore>, kind: TokenKind, ttl: Duration) -> Self {
        Self { store, kind, ttl }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn op(&self, name: &str) -> String {
        format!("{}/{}", self.kind.prefix(), name)
    }

    /// Creates a token for an email, or returns the live one if it
    /// already exists. Idempotent; the TTL clock is not reset.
    pub async fn create(&self, email: &str) -> Result<Token, ServiceError> {
        if self.exists_for_email(email).await? {
            return self.get_for_email(email).await;
        }

        let id = generate_secure_token();
        let created = fetch_opt::<Token>(
            &self.store,
            &self.op("create_token"),
            &[json!(id), json!(email)],
        )
        .await;

        match created {
            Ok(Some(token)) => {
                counter!(metric_keys::TOKEN_CREATED).increment(1);
                Ok(token)
            },
            Ok(None) => Err(ServiceError::Internal(
                "token row missing after insert".to_string(),
            )),
            // lost a create race; the store's per-email uniqueness is
            // authoritative, so return the winner's token
            Err(ServiceError::Store(StoreError::Constraint(_))) => self.get_for_email(email).await,
            Err(e) => Err(e),
        }
    }

    /// Returns whether or not a token exists.
    pub async fn exists(&self, token_id: &str) -> Result<bool, ServiceError> {
        let token: Option<Token> =
            fetch_opt(&self.store, &self.op("get_token"), &[json!(token_id)]).await?;
        Ok(token.is_some())
    }

    /// Returns whether or not a token exists for an email address.
    pub async fn exists_for_email(&self, email: &str) -> Result<bool, ServiceError> {
        let token: Option<Token> = fetch_opt(
            &self.store,
            &self.op("get_token_by_email"),
            &[json!(email)],
        )
        .await?;
        Ok(token.is_some())
    }

    /// Returns a token record.
    pub async fn get(&self, token_id: &str) -> Result<Token, ServiceError> {
        fetch_opt(&self.store, &self.op("get_token"), &[json!(token_id)])
            .await?
            .ok_or_else(|| ServiceError::NotFound(self.kind.not_found().to_string()))
    }

    /// Returns the token for an email address.
    pub async fn get_for_email(&self, email: &str) -> Result<Token, ServiceError> {
        fetch_opt(
            &self.store,
            &self.op("get_token_by_email"),
            &[json!(email)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound(self.kind.not_found_for_email().to_string()))
    }

    /// Returns all live tokens; used by the pruning scheduler.
    pub async fn tokens(&self) -> Result<Vec<Token>, ServiceError> {
        fetch_all(&self.store, &self.op("get_tokens"), &[]).await
    }

    /// Returns the user who owns a token.
    pub async fn user_for_token(&self, token_id: &str) -> Result<User, ServiceError> {
        fetch_opt(
            &self.store,
            &self.op("get_user_by_token"),
            &[json!(token_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("User does not exist for given token".to_string()))
    }

    /// Deletes a token; a no-op when already gone.
    pub async fn delete(&self, token_id: &str) -> Result<(), ServiceError> {
        exec(&self.store, &self.op("delete_token"), &[json!(token_id)]).await
    }

    /// Bulk-deletes all tokens whose age meets or exceeds the TTL.
    /// Returns how many were removed.
    pub async fn prune(&self) -> Result<usize, ServiceError> {
        let pruned = self
            .store
            .execute(
                &self.op("prune_tokens"),
                &[json!(self.ttl.as_secs() as i64)],
            )
            .await?;
        if !pruned.is_empty() {
            counter!(metric_keys::TOKEN_PRUNED).increment(pruned.len() as u64);
        }
        Ok(pruned.len())
    }

    /// Time until a token's expiry instant, clamped at zero.
    pub fn remaining(&self, token: &Token) -> Duration {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let expires_at = token.create_time + self.ttl.as_secs() as i64;
        Duration::from_secs(expires_at.saturating_sub(now).max(0) as u64)
    }
}
