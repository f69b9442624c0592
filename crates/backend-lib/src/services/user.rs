// ============================
// greenpoll-backend-lib/src/services/user.rs
// ============================

//! User directory: identity, credential verification, and profile
//! mutation.
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{exec, fetch_all, fetch_opt, poll::Poll, session::Session, SessionService};
use crate::auth::{hash_password_secure, verify_password, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use crate::error::ServiceError;
use crate::metrics as metric_keys;
use crate::store::RecordStore;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 63;
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_EMAIL_LENGTH: usize = 63;

/// A user record. `password` holds the scrypt hash, never plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub verified: bool,
    pub join_time: i64,
}

/// User services.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RecordStore>,
    sessions: SessionService,
}

impl UserService {
    pub fn new(store: Arc<dyn RecordStore>, sessions: SessionService) -> Self {
        Self { store, sessions }
    }

    /// Creates a user and returns the resulting record.
    ///
    /// Checks run in a fixed order and the first failure wins; nothing
    /// is written until all of them pass. The store re-checks the
    /// uniqueness constraints under its lock, so the pre-checks here
    /// only exist for the error messages.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        if self.user_exists_for_username(username).await? {
            return Err(ServiceError::Validation("Username is in use".to_string()));
        }
        if self.user_exists_for_email(email).await? {
            return Err(ServiceError::Validation("Email is in use".to_string()));
        }
        if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
            return Err(ServiceError::Validation(
                "Username must be between 3 and 63 characters".to_string(),
            ));
        }
        if email.len() < MIN_EMAIL_LENGTH || email.len() > MAX_EMAIL_LENGTH {
            return Err(ServiceError::Validation(
                "Email must be between 5 and 63 characters".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LENGTH || password.len() > MAX_PASSWORD_LENGTH {
            return Err(ServiceError::Validation(
                "Password must be between 8 and 255 characters".to_string(),
            ));
        }

        // hash from an owned buffer that is wiped afterwards
        let mut plain = password.to_owned();
        let password_hash =
            hash_password_secure(&mut plain).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let user: User = fetch_opt(
            &self.store,
            "user/create_user",
            &[json!(username), json!(email), json!(password_hash)],
        )
        .await?
        .ok_or_else(|| ServiceError::Internal("user row missing after insert".to_string()))?;

        counter!(metric_keys::USER_CREATED).increment(1);
        Ok(user)
    }

    /// Returns whether or not a user exists.
    pub async fn user_exists(&self, user_id: i64) -> Result<bool, ServiceError> {
        let user: Option<User> =
            fetch_opt(&self.store, "user/get_user", &[json!(user_id)]).await?;
        Ok(user.is_some())
    }

    /// Returns whether or not a user exists given a username.
    pub async fn user_exists_for_username(&self, username: &str) -> Result<bool, ServiceError> {
        let user: Option<User> = fetch_opt(
            &self.store,
            "user/get_user_by_username",
            &[json!(username)],
        )
        .await?;
        Ok(user.is_some())
    }

    /// Returns whether or not a user exists given an email address.
    pub async fn user_exists_for_email(&self, email: &str) -> Result<bool, ServiceError> {
        let user: Option<User> =
            fetch_opt(&self.store, "user/get_user_by_email", &[json!(email)]).await?;
        Ok(user.is_some())
    }

    /// Returns a user.
    pub async fn get_user(&self, user_id: i64) -> Result<User, ServiceError> {
        fetch_opt(&self.store, "user/get_user", &[json!(user_id)])
            .await?
            .ok_or_else(|| ServiceError::NotFound("User does not exist".to_string()))
    }

    /// Returns a user given a username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<User, ServiceError> {
        fetch_opt(
            &self.store,
            "user/get_user_by_username",
            &[json!(username)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("User does not exist".to_string()))
    }

    /// Returns a user given an email address.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        fetch_opt(&self.store, "user/get_user_by_email", &[json!(email)])
            .await?
            .ok_or_else(|| ServiceError::NotFound("User does not exist".to_string()))
    }

    /// Sets a user's username.
    ///
    /// The uniqueness check runs against all users, including the
    /// caller's own current row, so re-submitting an unchanged username
    /// fails with "Username is in use".
    pub async fn set_username(&self, user_id: i64, username: &str) -> Result<(), ServiceError> {
        if self.user_exists_for_username(username).await? {
            return Err(ServiceError::Validation("Username is in use".to_string()));
        }
        if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
            return Err(ServiceError::Validation(
                "Username must be between 3 and 63 characters".to_string(),
            ));
        }
        exec(
            &self.store,
            "user/set_username",
            &[json!(username), json!(user_id)],
        )
        .await
    }

    /// Sets a user's email address. Same own-row caveat as
    /// [`UserService::set_username`].
    pub async fn set_email(&self, user_id: i64, email: &str) -> Result<(), ServiceError> {
        if self.user_exists_for_email(email).await? {
            return Err(ServiceError::Validation("Email is in use".to_string()));
        }
        if email.len() < MIN_EMAIL_LENGTH || email.len() > MAX_EMAIL_LENGTH {
            return Err(ServiceError::Validation(
                "Email must be between 5 and 63 characters".to_string(),
            ));
        }
        exec(
            &self.store,
            "user/set_email",
            &[json!(email), json!(user_id)],
        )
        .await
    }

    /// Sets a user's password, re-hashing before persistence.
    pub async fn set_password(&self, user_id: i64, password: &str) -> Result<(), ServiceError> {
        if password.len() < MIN_PASSWORD_LENGTH || password.len() > MAX_PASSWORD_LENGTH {
            return Err(ServiceError::Validation(
                "Password must be between 8 and 255 characters".to_string(),
            ));
        }
        let mut plain = password.to_owned();
        let password_hash =
            hash_password_secure(&mut plain).map_err(|e| ServiceError::Internal(e.to_string()))?;
        exec(
            &self.store,
            "user/set_password",
            &[json!(password_hash), json!(user_id)],
        )
        .await
    }

    /// Sets a user's verified status.
    pub async fn set_verified(&self, user_id: i64, verified: bool) -> Result<(), ServiceError> {
        exec(
            &self.store,
            "user/set_verified",
            &[json!(verified), json!(user_id)],
        )
        .await
    }

    /// Logs a user in and returns the new session.
    ///
    /// Unknown email and wrong password produce the identical
    /// `InvalidCredentials` error, so a caller cannot tell which half
    /// of the check failed.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let user = match self.get_user_by_email(email).await {
            Ok(user) => user,
            Err(ServiceError::NotFound(_)) => return Err(ServiceError::InvalidCredentials),
            Err(e) => return Err(e),
        };
        if !verify_password(&user.password, password) {
            return Err(ServiceError::InvalidCredentials);
        }
        self.sessions.create_session(user.id).await
    }

    /// Returns all polls created by a user.
    pub async fn get_user_polls(&self, user_id: i64) -> Result<Vec<Poll>, ServiceError> {
        fetch_all(&self.store, "user/get_user_polls", &[json!(user_id)]).await
    }

    /// Returns the polls a user has voted on.
    pub async fn get_user_vote_polls(&self, user_id: i64) -> Result<Vec<Poll>, ServiceError> {
        fetch_all(&self.store, "user/get_user_vote_polls", &[json!(user_id)]).await
    }

    /// Deletes a user and everything they own.
    pub async fn delete_user(&self, user_id: i64) -> Result<(), ServiceError> {
        exec(&self.store, "user/delete_user", &[json!(user_id)]).await
    }

    /// Deletes unverified users whose verification window has lapsed.
    pub async fn prune_unverified_users(&self, ttl: Duration) -> Result<(), ServiceError> {
        exec(
            &self.store,
            "user/prune_unverified_users",
            &[json!(ttl.as_secs() as i64)],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use crate::{config::Settings, store::MemoryStore};

    async fn services() -> Services {
        Services::new(Arc::new(MemoryStore::new()), &Settings::default())
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let services = services().await;
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        assert_ne!(user.password, "password123");
        assert!(!user.verified);
        assert!(user.join_time > 0);
    }

    #[tokio::test]
    async fn test_create_user_validation_order() {
        let services = services().await;
        services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        // taken username wins over every later check
        let err = services
            .users
            .create_user("alice", "x@y.z", "short")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username is in use");

        // taken email wins over length checks
        let err = services
            .users
            .create_user("bob", "alice@example.com", "short")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email is in use");
    }

    #[tokio::test]
    async fn test_username_length_boundaries() {
        let services = services().await;
        let err = services
            .users
            .create_user("ab", "ab@example.com", "password123")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Username must be between 3 and 63 characters"
        );

        services
            .users
            .create_user("abc", "abc@example.com", "password123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_password_length_boundaries() {
        let services = services().await;
        let err = services
            .users
            .create_user("alice", "alice@example.com", "seven77")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Password must be between 8 and 255 characters"
        );

        services
            .users
            .create_user("alice", "alice@example.com", "eight888")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_non_disclosure() {
        let services = services().await;
        services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        let unknown = services
            .users
            .login("nouser@example.com", "whatever99")
            .await
            .unwrap_err();
        let wrong_pass = services
            .users
            .login("alice@example.com", "wrongpass99")
            .await
            .unwrap_err();

        assert!(matches!(unknown, ServiceError::InvalidCredentials));
        assert!(matches!(wrong_pass, ServiceError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong_pass.to_string());
    }

    #[tokio::test]
    async fn test_login_creates_session() {
        let services = services().await;
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let session = services
            .users
            .login("alice@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn test_set_username_rejects_own_current_value() {
        let services = services().await;
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let err = services
            .users
            .set_username(user.id, "alice")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username is in use");
    }

    #[tokio::test]
    async fn test_set_email() {
        let services = services().await;
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        services
            .users
            .set_email(user.id, "alice@elsewhere.com")
            .await
            .unwrap();
        assert!(services
            .users
            .user_exists_for_email("alice@elsewhere.com")
            .await
            .unwrap());

        // same own-row behavior as usernames
        let err = services
            .users
            .set_email(user.id, "alice@elsewhere.com")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email is in use");
    }

    #[tokio::test]
    async fn test_set_password_rehashes() {
        let services = services().await;
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        services
            .users
            .set_password(user.id, "new-password-1")
            .await
            .unwrap();
        services
            .users
            .login("alice@example.com", "new-password-1")
            .await
            .unwrap();
        let err = services
            .users
            .login("alice@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let services = services().await;
        let user = services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        services.users.delete_user(user.id).await.unwrap();
        assert!(!services.users.user_exists(user.id).await.unwrap());
    }
}
