// ============================
// greenpoll-backend-lib/src/services/poll_vote.rs
// ============================

//! Votes, with the one-vote-per-user-per-poll invariant.
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{exec, fetch_opt, poll::Poll, PollOptionService};
use crate::error::ServiceError;
use crate::metrics as metric_keys;
use crate::store::RecordStore;

/// A vote record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollVote {
    pub id: i64,
    pub user_id: i64,
    pub poll_id: i64,
    pub poll_option_id: i64,
    pub vote_time: i64,
}

/// Poll vote services.
#[derive(Clone)]
pub struct PollVoteService {
    store: Arc<dyn RecordStore>,
    options: PollOptionService,
}

impl PollVoteService {
    pub fn new(store: Arc<dyn RecordStore>, options: PollOptionService) -> Self {
        Self { store, options }
    }

    /// Returns whether or not a user has voted on a poll.
    pub async fn poll_vote_exists(&self, user_id: i64, poll_id: i64) -> Result<bool, ServiceError> {
        let vote: Option<PollVote> = fetch_opt(
            &self.store,
            "poll_vote/get_poll_vote",
            &[json!(user_id), json!(poll_id)],
        )
        .await?;
        Ok(vote.is_some())
    }

    /// Returns a user's vote on a poll.
    pub async fn get_poll_vote(&self, user_id: i64, poll_id: i64) -> Result<PollVote, ServiceError> {
        fetch_opt(
            &self.store,
            "poll_vote/get_poll_vote",
            &[json!(user_id), json!(poll_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("Poll vote does not exist".to_string()))
    }

    /// Returns a vote record given its id.
    pub async fn get_poll_vote_by_vote_id(&self, vote_id: i64) -> Result<PollVote, ServiceError> {
        fetch_opt(
            &self.store,
            "poll_vote/get_poll_vote_by_vote_id",
            &[json!(vote_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("Poll vote does not exist".to_string()))
    }

    /// Returns the poll associated with a vote.
    pub async fn get_poll_vote_poll(&self, vote_id: i64) -> Result<Poll, ServiceError> {
        fetch_opt(
            &self.store,
            "poll_vote/get_poll_vote_poll",
            &[json!(vote_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("Poll does not exist".to_string()))
    }

    /// Casts a vote, replacing any earlier vote by this user on the
    /// same poll.
    ///
    /// The poll is resolved from the option, then the store performs
    /// the remove-and-insert as one atomic operation, so two concurrent
    /// votes by the same user can never leave two surviving rows.
    pub async fn vote(&self, user_id: i64, poll_option_id: i64) -> Result<PollVote, ServiceError> {
        let poll = self.options.get_poll_option_poll(poll_option_id).await?;

        let vote: PollVote = fetch_opt(
            &self.store,
            "poll_vote/vote",
            &[json!(user_id), json!(poll.id), json!(poll_option_id)],
        )
        .await?
        .ok_or_else(|| ServiceError::Internal("vote row missing after insert".to_string()))?;

        counter!(metric_keys::VOTE_CAST).increment(1);
        Ok(vote)
    }

    /// Removes a user's vote from a poll. Not an error if there is no
    /// vote to remove.
    pub async fn unvote(&self, user_id: i64, poll_id: i64) -> Result<(), ServiceError> {
        exec(
            &self.store,
            "poll_vote/unvote",
            &[json!(user_id), json!(poll_id)],
        )
        .await
    }

    /// Removes a user's vote given the poll option it referenced.
    pub async fn unvote_by_poll_option_id(
        &self,
        user_id: i64,
        poll_option_id: i64,
    ) -> Result<(), ServiceError> {
        exec(
            &self.store,
            "poll_vote/unvote_by_poll_option_id",
            &[json!(user_id), json!(poll_option_id)],
        )
        .await
    }
}
