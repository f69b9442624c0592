// ============================
// greenpoll-backend-lib/src/services/mod.rs
// ============================

//! Domain services.
//!
//! Each service owns one record family and talks to the shared
//! [`RecordStore`]. Cross-service calls go through explicit handles
//! passed in at construction (login needs sessions, token redemption
//! needs the user directory, votes need option lookups), so the
//! dependency graph stays acyclic and there are no globals.

pub mod password_reset;
pub mod poll;
pub mod poll_option;
pub mod poll_vote;
pub mod session;
pub mod tokens;
pub mod user;
pub mod verify;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Settings;
use crate::error::ServiceError;
use crate::store::{decode_rows, RecordStore};

pub use password_reset::PasswordResetService;
pub use poll::{Poll, PollService, PollVoter};
pub use poll_option::{PollOption, PollOptionService, NUM_POLL_OPTIONS};
pub use poll_vote::{PollVote, PollVoteService};
pub use session::{Session, SessionService, NUM_USER_SESSIONS};
pub use tokens::{Token, TokenKind, TokenLedger};
pub use user::{User, UserService};
pub use verify::VerifyService;

/// Execute an operation and decode every row into `T`.
pub(crate) async fn fetch_all<T: DeserializeOwned>(
    store: &Arc<dyn RecordStore>,
    op: &str,
    params: &[Value],
) -> Result<Vec<T>, ServiceError> {
    let rows = store.execute(op, params).await?;
    Ok(decode_rows(rows)?)
}

/// Execute an operation expected to match at most one row.
pub(crate) async fn fetch_opt<T: DeserializeOwned>(
    store: &Arc<dyn RecordStore>,
    op: &str,
    params: &[Value],
) -> Result<Option<T>, ServiceError> {
    Ok(fetch_all(store, op, params).await?.into_iter().next())
}

/// Execute an operation, discarding any rows.
pub(crate) async fn exec(
    store: &Arc<dyn RecordStore>,
    op: &str,
    params: &[Value],
) -> Result<(), ServiceError> {
    store.execute(op, params).await?;
    Ok(())
}

/// The full set of domain services, wired to one store.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub users: UserService,
    pub sessions: SessionService,
    pub verifications: VerifyService,
    pub password_resets: PasswordResetService,
    pub polls: PollService,
    pub poll_options: PollOptionService,
    pub poll_votes: PollVoteService,
}

impl Services {
    pub fn new(store: Arc<dyn RecordStore>, settings: &Settings) -> Self {
        let sessions = SessionService::new(store.clone(), settings.sessions.max_per_user);
        let users = UserService::new(store.clone(), sessions.clone());
        let verifications = VerifyService::new(
            store.clone(),
            users.clone(),
            Duration::from_secs(settings.tokens.verify_ttl_secs),
        );
        let password_resets = PasswordResetService::new(
            store.clone(),
            users.clone(),
            Duration::from_secs(settings.tokens.password_reset_ttl_secs),
        );
        let polls = PollService::new(store.clone());
        let poll_options = PollOptionService::new(store.clone(), polls.clone());
        let poll_votes = PollVoteService::new(store.clone(), poll_options.clone());

        Self {
            store,
            users,
            sessions,
            verifications,
            password_resets,
            polls,
            poll_options,
            poll_votes,
        }
    }
}
