// ============================
// greenpoll-backend-lib/src/services/session.rs
// ============================

//! Login session management.
//!
//! Sessions have no TTL; instead each user is capped at
//! [`NUM_USER_SESSIONS`] concurrent sessions and creating one beyond
//! the cap evicts the oldest.
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{exec, fetch_all, fetch_opt, user::User};
use crate::auth::generate_secure_token;
use crate::error::ServiceError;
use crate::metrics as metric_keys;
use crate::store::RecordStore;

/// The default maximum number of sessions per user.
pub const NUM_USER_SESSIONS: usize = 4;

/// A login session. The id is an opaque bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub create_time: i64,
}

/// Session services.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn RecordStore>,
    max_per_user: usize,
}

impl SessionService {
    pub fn new(store: Arc<dyn RecordStore>, max_per_user: usize) -> Self {
        Self {
            store,
            max_per_user,
        }
    }

    /// Creates a session for a user, evicting their oldest sessions
    /// beyond the per-user cap.
    pub async fn create_session(&self, user_id: i64) -> Result<Session, ServiceError> {
        let id = generate_secure_token();
        let session: Session = fetch_opt(
            &self.store,
            "session/create_session",
            &[json!(id), json!(user_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::Internal("session row missing after insert".to_string()))?;

        exec(
            &self.store,
            "session/delete_old_user_sessions",
            &[json!(user_id), json!(self.max_per_user as i64)],
        )
        .await?;

        counter!(metric_keys::SESSION_CREATED).increment(1);
        Ok(session)
    }

    /// Returns whether or not a session exists.
    pub async fn session_exists(&self, session_id: &str) -> Result<bool, ServiceError> {
        let session: Option<Session> =
            fetch_opt(&self.store, "session/get_session", &[json!(session_id)]).await?;
        Ok(session.is_some())
    }

    /// Returns a session record.
    pub async fn get_session(&self, session_id: &str) -> Result<Session, ServiceError> {
        fetch_opt(&self.store, "session/get_session", &[json!(session_id)])
            .await?
            .ok_or_else(|| ServiceError::NotFound("Session does not exist".to_string()))
    }

    /// Returns the user associated with a session.
    pub async fn get_user_by_session_id(&self, session_id: &str) -> Result<User, ServiceError> {
        fetch_opt(
            &self.store,
            "session/get_user_by_session_id",
            &[json!(session_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("User or session does not exist".to_string()))
    }

    /// Returns all sessions associated with a user, oldest first.
    pub async fn get_user_sessions(&self, user_id: i64) -> Result<Vec<Session>, ServiceError> {
        fetch_all(&self.store, "session/get_user_sessions", &[json!(user_id)]).await
    }

    /// Deletes a session. Deleting a non-existent session is not an
    /// error.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ServiceError> {
        exec(&self.store, "session/delete_session", &[json!(session_id)]).await
    }

    /// Deletes all sessions associated with a user.
    pub async fn delete_user_sessions(&self, user_id: i64) -> Result<(), ServiceError> {
        exec(
            &self.store,
            "session/delete_user_sessions",
            &[json!(user_id)],
        )
        .await
    }
}
