// ============================
// greenpoll-backend-lib/src/pruner.rs
// ============================

//! Token expiry scheduling.
//!
//! Each live token gets a one-shot timer that fires at its expiry
//! instant. Timers do not survive a restart, so startup runs a sweep
//! that removes anything that expired while the process was down and
//! re-arms timers for whatever is still live. Between a missed timer
//! and the next sweep an expired token can linger, but it lingers
//! inert: redemption always re-checks existence first.
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::services::{tokens::Token, PasswordResetService, UserService, VerifyService};

/// Schedules and executes token expiry.
#[derive(Clone)]
pub struct Pruner {
    verifications: VerifyService,
    password_resets: PasswordResetService,
    users: UserService,
}

impl Pruner {
    pub fn new(
        verifications: VerifyService,
        password_resets: PasswordResetService,
        users: UserService,
    ) -> Self {
        Self {
            verifications,
            password_resets,
            users,
        }
    }

    /// Removes everything that expired while the process was down,
    /// then re-arms timers for the tokens that remain.
    pub async fn startup_sweep(&self) -> Result<(), ServiceError> {
        let verify_ledger = self.verifications.ledger();
        let reset_ledger = self.password_resets.ledger();

        // unverified accounts whose token already expired go with it
        self.users
            .prune_unverified_users(verify_ledger.ttl())
            .await?;
        let pruned_verify = verify_ledger.prune().await?;
        let pruned_reset = reset_ledger.prune().await?;
        if pruned_verify > 0 || pruned_reset > 0 {
            info!(
                verify = pruned_verify,
                password_reset = pruned_reset,
                "pruned expired tokens at startup"
            );
        }

        for token in verify_ledger.tokens().await? {
            self.schedule_verification(&token);
        }
        for token in reset_ledger.tokens().await? {
            self.schedule_password_reset(&token);
        }
        Ok(())
    }

    /// Arms a one-shot timer that, at expiry, deletes the verification
    /// token and the still-unverified account that owns it.
    pub fn schedule_verification(&self, token: &Token) {
        let delay = self.verifications.ledger().remaining(token);
        let verifications = self.verifications.clone();
        let token_id = token.id.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = verifications.delete_unverified_user(&token_id).await {
                warn!(error = %e, "failed to prune expired verification token");
            }
        });
    }

    /// Arms a one-shot timer that deletes the reset token at expiry.
    pub fn schedule_password_reset(&self, token: &Token) {
        let delay = self.password_resets.ledger().remaining(token);
        let password_resets = self.password_resets.clone();
        let token_id = token.id.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = password_resets.ledger().delete(&token_id).await {
                warn!(error = %e, "failed to prune expired password reset token");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::Settings;
    use crate::services::Services;
    use crate::store::MemoryStore;

    fn zero_ttl_settings() -> Settings {
        let mut settings = Settings::default();
        settings.tokens.verify_ttl_secs = 0;
        settings.tokens.password_reset_ttl_secs = 0;
        settings
    }

    fn pruner(services: &Services) -> Pruner {
        Pruner::new(
            services.verifications.clone(),
            services.password_resets.clone(),
            services.users.clone(),
        )
    }

    #[tokio::test]
    async fn test_startup_sweep_removes_expired_tokens_and_accounts() {
        let services = Services::new(Arc::new(MemoryStore::new()), &zero_ttl_settings());
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let token = services
            .verifications
            .create("alice@example.com")
            .await
            .unwrap();

        pruner(&services).startup_sweep().await.unwrap();

        assert!(!services
            .verifications
            .ledger()
            .exists(&token.id)
            .await
            .unwrap());
        assert!(!services.users.user_exists(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_startup_sweep_keeps_live_tokens() {
        let services = Services::new(Arc::new(MemoryStore::new()), &Settings::default());
        services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let token = services
            .verifications
            .create("alice@example.com")
            .await
            .unwrap();

        pruner(&services).startup_sweep().await.unwrap();

        assert!(services
            .verifications
            .ledger()
            .exists(&token.id)
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_timer_removes_unverified_account() {
        let services = Services::new(Arc::new(MemoryStore::new()), &zero_ttl_settings());
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let token = services
            .verifications
            .create("alice@example.com")
            .await
            .unwrap();

        pruner(&services).schedule_verification(&token);
        // paused time: yields until the spawned timer task completes
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!services.users.user_exists(user.id).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_timer_spares_redeemed_account() {
        let services = Services::new(Arc::new(MemoryStore::new()), &zero_ttl_settings());
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let token = services
            .verifications
            .create("alice@example.com")
            .await
            .unwrap();
        services.verifications.redeem(&token.id).await.unwrap();

        pruner(&services).schedule_verification(&token);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(services.users.user_exists(user.id).await.unwrap());
        let user = services.users.get_user(user.id).await.unwrap();
        assert!(user.verified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_password_reset_timer_deletes_token() {
        let services = Services::new(Arc::new(MemoryStore::new()), &zero_ttl_settings());
        services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let token = services
            .password_resets
            .create("alice@example.com")
            .await
            .unwrap();

        pruner(&services).schedule_password_reset(&token);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!services
            .password_resets
            .ledger()
            .exists(&token.id)
            .await
            .unwrap());
        // the account itself is untouched
        assert!(services
            .users
            .user_exists_for_email("alice@example.com")
            .await
            .unwrap());
    }
}
