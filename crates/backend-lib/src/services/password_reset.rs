// ============================
// greenpoll-backend-lib/src/services/password_reset.rs
// ============================

//! Password resets: a one-hour, single-use token emailed on request.
//! Redemption consumes the token, then re-hashes and stores the new
//! password.
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use super::{tokens::Token, TokenKind, TokenLedger, UserService};
use crate::error::ServiceError;
use crate::metrics as metric_keys;
use crate::store::RecordStore;

/// Password reset services.
#[derive(Clone)]
pub struct PasswordResetService {
    ledger: TokenLedger,
    users: UserService,
}

impl PasswordResetService {
    pub fn new(store: Arc<dyn RecordStore>, users: UserService, ttl: Duration) -> Self {
        let ledger = TokenLedger::new(store, TokenKind::PasswordReset, ttl);
        Self { ledger, users }
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Creates a password reset token for an email, or returns the
    /// live one.
    pub async fn create(&self, email: &str) -> Result<Token, ServiceError> {
        self.ledger.create(email).await
    }

    /// Redeems a reset token: the token is consumed first, then the new
    /// password is applied. A token can only ever be redeemed once.
    pub async fn redeem(&self, token_id: &str, new_password: &str) -> Result<(), ServiceError> {
        if !self.ledger.exists(token_id).await? {
            return Err(ServiceError::InvalidToken);
        }
        let user = self.ledger.user_for_token(token_id).await?;
        self.ledger.delete(token_id).await?;
        self.users.set_password(user.id, new_password).await?;
        counter!(metric_keys::TOKEN_REDEEMED).increment(1);
        Ok(())
    }
}
