// ============================
// greenpoll-backend-lib/src/services/poll_option.rs
// ============================

//! Poll options, capped at [`NUM_POLL_OPTIONS`] per poll.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{exec, fetch_opt, poll::Poll, PollService};
use crate::error::ServiceError;
use crate::store::RecordStore;

/// The maximum number of options per poll.
pub const NUM_POLL_OPTIONS: usize = 5;

const MIN_VALUE_LENGTH: usize = 1;
const MAX_VALUE_LENGTH: usize = 255;

/// A poll option record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub id: i64,
    pub poll_id: i64,
    pub value: String,
}

/// Poll option services.
#[derive(Clone)]
pub struct PollOptionService {
    store: Arc<dyn RecordStore>,
    polls: PollService,
}

impl PollOptionService {
    pub fn new(store: Arc<dyn RecordStore>, polls: PollService) -> Self {
        Self { store, polls }
    }

    /// Creates a poll option and returns the resulting record.
    ///
    /// The count check here produces the friendly error; the store
    /// re-checks the cap under its lock, which is what actually holds
    /// under concurrent option creation.
    pub async fn create_poll_option(
        &self,
        poll_id: i64,
        value: &str,
    ) -> Result<PollOption, ServiceError> {
        let num_options = self.get_num_poll_options(poll_id).await?;
        if num_options >= NUM_POLL_OPTIONS {
            return Err(ServiceError::Validation(
                "Maximum number of poll options has been reached".to_string(),
            ));
        }
        if value.len() < MIN_VALUE_LENGTH || value.len() > MAX_VALUE_LENGTH {
            return Err(ServiceError::Validation(
                "Option text must be between 1 and 255 characters".to_string(),
            ));
        }

        fetch_opt(
            &self.store,
            "poll_option/create_poll_option",
            &[json!(poll_id), json!(value)],
        )
        .await?
        .ok_or_else(|| ServiceError::Internal("poll option row missing after insert".to_string()))
    }

    /// Returns whether or not a poll option exists.
    pub async fn poll_option_exists(&self, option_id: i64) -> Result<bool, ServiceError> {
        let option: Option<PollOption> = fetch_opt(
            &self.store,
            "poll_option/get_poll_option",
            &[json!(option_id)],
        )
        .await?;
        Ok(option.is_some())
    }

    /// Returns a poll option.
    pub async fn get_poll_option(&self, option_id: i64) -> Result<PollOption, ServiceError> {
        fetch_opt(
            &self.store,
            "poll_option/get_poll_option",
            &[json!(option_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("Poll option does not exist".to_string()))
    }

    /// Returns the poll associated with a poll option.
    pub async fn get_poll_option_poll(&self, option_id: i64) -> Result<Poll, ServiceError> {
        fetch_opt(
            &self.store,
            "poll_option/get_poll_option_poll",
            &[json!(option_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("Poll option does not exist".to_string()))
    }

    /// Sets the text representing a poll option.
    pub async fn set_poll_option_value(
        &self,
        option_id: i64,
        value: &str,
    ) -> Result<(), ServiceError> {
        if value.len() < MIN_VALUE_LENGTH || value.len() > MAX_VALUE_LENGTH {
            return Err(ServiceError::Validation(
                "Option text must be between 1 and 255 characters".to_string(),
            ));
        }
        exec(
            &self.store,
            "poll_option/set_poll_option_value",
            &[json!(value), json!(option_id)],
        )
        .await
    }

    /// Returns the number of options on a poll.
    pub async fn get_num_poll_options(&self, poll_id: i64) -> Result<usize, ServiceError> {
        let options = self.polls.get_poll_options(poll_id).await?;
        Ok(options.len())
    }

    /// Deletes a poll option and any votes referencing it.
    pub async fn delete_poll_option(&self, option_id: i64) -> Result<(), ServiceError> {
        exec(
            &self.store,
            "poll_option/delete_poll_option",
            &[json!(option_id)],
        )
        .await
    }
}
