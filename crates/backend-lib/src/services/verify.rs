// ============================
// greenpoll-backend-lib/src/services/verify.rs
// ============================

//! Account verification: a one-hour, single-use token emailed at
//! registration. Redemption flips the user's verified flag; expiry of
//! an unredeemed token removes the still-unverified account.
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde_json::json;

use super::{exec, tokens::Token, TokenKind, TokenLedger, UserService};
use crate::error::ServiceError;
use crate::metrics as metric_keys;
use crate::store::RecordStore;

/// Verification services.
#[derive(Clone)]
pub struct VerifyService {
    store: Arc<dyn RecordStore>,
    ledger: TokenLedger,
    users: UserService,
}

impl VerifyService {
    pub fn new(store: Arc<dyn RecordStore>, users: UserService, ttl: Duration) -> Self {
        let ledger = TokenLedger::new(store.clone(), TokenKind::Verification, ttl);
        Self {
            store,
            ledger,
            users,
        }
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Creates a verification token for an email, or returns the live
    /// one.
    pub async fn create(&self, email: &str) -> Result<Token, ServiceError> {
        self.ledger.create(email).await
    }

    /// Redeems a verification token: the token is consumed first, then
    /// the owning user is marked verified. A token can only ever be
    /// redeemed once.
    pub async fn redeem(&self, token_id: &str) -> Result<(), ServiceError> {
        if !self.ledger.exists(token_id).await? {
            return Err(ServiceError::InvalidToken);
        }
        let user = self.ledger.user_for_token(token_id).await?;
        self.ledger.delete(token_id).await?;
        self.users.set_verified(user.id, true).await?;
        counter!(metric_keys::TOKEN_REDEEMED).increment(1);
        Ok(())
    }

    /// Deletes an expired verification token along with its owner, if
    /// the owner never verified. No-op for already-redeemed tokens.
    pub async fn delete_unverified_user(&self, token_id: &str) -> Result<(), ServiceError> {
        exec(
            &self.store,
            "verify/delete_unverified_user",
            &[json!(token_id)],
        )
        .await
    }
}
