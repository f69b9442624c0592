// ============================
// greenpoll-backend-lib/src/services/poll.rs
// ============================

//! Polls and their read projections.
//!
//! Ownership is not checked here; the routing layer resolves the
//! current user and compares against `Poll::user_id` before calling any
//! mutation.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{exec, fetch_all, fetch_opt, poll_option::PollOption, poll_vote::PollVote};
use crate::error::ServiceError;
use crate::store::RecordStore;

const MIN_TITLE_LENGTH: usize = 1;
const MAX_TITLE_LENGTH: usize = 255;
const MAX_DESCRIPTION_LENGTH: usize = 1023;

/// A poll record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub create_time: i64,
}

/// Vote and voter information for one vote on a poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollVoter {
    pub user_id: i64,
    pub username: String,
    pub poll_option_id: i64,
    pub poll_option_value: String,
    pub vote_time: i64,
}

/// Poll services.
#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn RecordStore>,
}

impl PollService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn validate_title(title: &str) -> Result<(), ServiceError> {
        if title.len() < MIN_TITLE_LENGTH || title.len() > MAX_TITLE_LENGTH {
            return Err(ServiceError::Validation(
                "Title must be between 1 and 255 characters".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_description(description: &str) -> Result<(), ServiceError> {
        if description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(ServiceError::Validation(
                "Description must be no more than 1023 characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates a poll and returns the resulting record.
    pub async fn create_poll(
        &self,
        user_id: i64,
        title: &str,
        description: &str,
    ) -> Result<Poll, ServiceError> {
        Self::validate_title(title)?;
        Self::validate_description(description)?;

        fetch_opt(
            &self.store,
            "poll/create_poll",
            &[json!(user_id), json!(title), json!(description)],
        )
        .await?
        .ok_or_else(|| ServiceError::Internal("poll row missing after insert".to_string()))
    }

    /// Returns whether or not a poll exists.
    pub async fn poll_exists(&self, poll_id: i64) -> Result<bool, ServiceError> {
        let poll: Option<Poll> =
            fetch_opt(&self.store, "poll/get_poll", &[json!(poll_id)]).await?;
        Ok(poll.is_some())
    }

    /// Returns a poll.
    pub async fn get_poll(&self, poll_id: i64) -> Result<Poll, ServiceError> {
        fetch_opt(&self.store, "poll/get_poll", &[json!(poll_id)])
            .await?
            .ok_or_else(|| ServiceError::NotFound("Poll does not exist".to_string()))
    }

    /// Returns all options associated with a poll.
    pub async fn get_poll_options(&self, poll_id: i64) -> Result<Vec<PollOption>, ServiceError> {
        fetch_all(&self.store, "poll/get_poll_options", &[json!(poll_id)]).await
    }

    /// Returns all votes associated with a poll.
    pub async fn get_poll_votes(&self, poll_id: i64) -> Result<Vec<PollVote>, ServiceError> {
        fetch_all(&self.store, "poll/get_poll_votes", &[json!(poll_id)]).await
    }

    /// Returns voter information for everyone who voted on a poll.
    pub async fn get_poll_voters(&self, poll_id: i64) -> Result<Vec<PollVoter>, ServiceError> {
        fetch_all(&self.store, "poll/get_poll_voters", &[json!(poll_id)]).await
    }

    /// Sets the poll title.
    pub async fn set_title(&self, poll_id: i64, title: &str) -> Result<(), ServiceError> {
        Self::validate_title(title)?;
        exec(
            &self.store,
            "poll/set_title",
            &[json!(title), json!(poll_id)],
        )
        .await
    }

    /// Sets the poll description.
    pub async fn set_description(
        &self,
        poll_id: i64,
        description: &str,
    ) -> Result<(), ServiceError> {
        Self::validate_description(description)?;
        exec(
            &self.store,
            "poll/set_description",
            &[json!(description), json!(poll_id)],
        )
        .await
    }

    /// Deletes a poll, its options, and its votes.
    pub async fn delete_poll(&self, poll_id: i64) -> Result<(), ServiceError> {
        exec(&self.store, "poll/delete_poll", &[json!(poll_id)]).await
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

    async fn test_user(services: &Services) -> i64 {
        services
            .users
            .create_user("alice", "alice@example.com", "password123")
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_title_boundaries() {
        let services = services().await;
        let user_id = test_user(&services).await;

        let err = services
            .polls
            .create_poll(user_id, "", "desc")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Title must be between 1 and 255 characters");

        services
            .polls
            .create_poll(user_id, &"t".repeat(255), "desc")
            .await
            .unwrap();

        let err = services
            .polls
            .create_poll(user_id, &"t".repeat(256), "desc")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_description_boundaries() {
        let services = services().await;
        let user_id = test_user(&services).await;

        services
            .polls
            .create_poll(user_id, "Lunch?", &"d".repeat(1023))
            .await
            .unwrap();

        let err = services
            .polls
            .create_poll(user_id, "Lunch?", &"d".repeat(1024))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Description must be no more than 1023 characters"
        );

        // empty description is allowed
        services
            .polls
            .create_poll(user_id, "Dinner?", "")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_title_and_description() {
        let services = services().await;
        let user_id = test_user(&services).await;
        let poll = services
            .polls
            .create_poll(user_id, "Lunch?", "")
            .await
            .unwrap();

        services
            .polls
            .set_title(poll.id, "Dinner?")
            .await
            .unwrap();
        services
            .polls
            .set_description(poll.id, "updated")
            .await
            .unwrap();

        let poll = services.polls.get_poll(poll.id).await.unwrap();
        assert_eq!(poll.title, "Dinner?");
        assert_eq!(poll.description, "updated");
    }

    #[tokio::test]
    async fn test_get_poll_not_found() {
        let services = services().await;
        let err = services.polls.get_poll(999).await.unwrap_err();
        assert_eq!(err.to_string(), "Poll does not exist");
    }

    #[tokio::test]
    async fn test_delete_poll_removes_options_and_votes() {
        let services = services().await;
        let user_id = test_user(&services).await;
        let poll = services
            .polls
            .create_poll(user_id, "Lunch?", "")
            .await
            .unwrap();
        let option = services
            .poll_options
            .create_poll_option(poll.id, "pizza")
            .await
            .unwrap();
        services.poll_votes.vote(user_id, option.id).await.unwrap();

        services.polls.delete_poll(poll.id).await.unwrap();
        assert!(!services.polls.poll_exists(poll.id).await.unwrap());
        assert!(!services
            .poll_options
            .poll_option_exists(option.id)
            .await
            .unwrap());
    }
}
