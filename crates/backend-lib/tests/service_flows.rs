// ============================
// greenpoll-backend-lib/tests/service_flows.rs
// ============================

//! End-to-end flows through the service layer, without HTTP.
use std::sync::Arc;

use greenpoll_backend_lib::config::Settings;
use greenpoll_backend_lib::error::ServiceError;
use greenpoll_backend_lib::services::{Services, NUM_POLL_OPTIONS, NUM_USER_SESSIONS};
use greenpoll_backend_lib::store::MemoryStore;

fn services() -> Services {
    Services::new(Arc::new(MemoryStore::new()), &Settings::default())
}

#[tokio::test]
async fn test_register_verify_login_flow() {
    let services = services();

    let user = services
        .users
        .create_user("alice", "alice@example.com", "password123")
        .await
        .unwrap();
    assert!(!user.verified);

    let token = services
        .verifications
        .create("alice@example.com")
        .await
        .unwrap();
    services.verifications.redeem(&token.id).await.unwrap();
    assert!(services.users.get_user(user.id).await.unwrap().verified);

    let session = services
        .users
        .login("alice@example.com", "password123")
        .await
        .unwrap();
    let by_session = services
        .sessions
        .get_user_by_session_id(&session.id)
        .await
        .unwrap();
    assert_eq!(by_session.id, user.id);
}

#[tokio::test]
async fn test_session_cap_keeps_newest() {
    let services = services();
    services
        .users
        .create_user("alice", "alice@example.com", "password123")
        .await
        .unwrap();

    let mut session_ids = Vec::new();
    for _ in 0..(NUM_USER_SESSIONS + 2) {
        let session = services
            .users
            .login("alice@example.com", "password123")
            .await
            .unwrap();
        session_ids.push(session.id);
    }

    let user = services
        .users
        .get_user_by_email("alice@example.com")
        .await
        .unwrap();
    let live = services.sessions.get_user_sessions(user.id).await.unwrap();
    assert_eq!(live.len(), NUM_USER_SESSIONS);

    // the two oldest were evicted, the rest survive
    assert!(!services
        .sessions
        .session_exists(&session_ids[0])
        .await
        .unwrap());
    assert!(!services
        .sessions
        .session_exists(&session_ids[1])
        .await
        .unwrap());
    for id in &session_ids[2..] {
        assert!(services.sessions.session_exists(id).await.unwrap());
    }
}

#[tokio::test]
async fn test_poll_lifecycle_with_votes() {
    let services = services();
    let alice = services
        .users
        .create_user("alice", "alice@example.com", "password123")
        .await
        .unwrap();
    let bob = services
        .users
        .create_user("bob", "bob@example.com", "password456")
        .await
        .unwrap();

    let poll = services
        .polls
        .create_poll(alice.id, "Lunch?", "Where should we eat?")
        .await
        .unwrap();

    let mut options = Vec::new();
    for value in ["pizza", "salad"] {
        options.push(
            services
                .poll_options
                .create_poll_option(poll.id, value)
                .await
                .unwrap(),
        );
    }

    services.poll_votes.vote(alice.id, options[0].id).await.unwrap();
    services.poll_votes.vote(bob.id, options[0].id).await.unwrap();
    // bob changes his mind
    services.poll_votes.vote(bob.id, options[1].id).await.unwrap();

    let votes = services.polls.get_poll_votes(poll.id).await.unwrap();
    assert_eq!(votes.len(), 2);

    let voters = services.polls.get_poll_voters(poll.id).await.unwrap();
    let bob_vote = voters.iter().find(|v| v.user_id == bob.id).unwrap();
    assert_eq!(bob_vote.poll_option_value, "salad");

    // deleting the poll removes everything under it
    services.polls.delete_poll(poll.id).await.unwrap();
    assert!(!services
        .poll_options
        .poll_option_exists(options[0].id)
        .await
        .unwrap());
    assert!(!services
        .poll_votes
        .poll_vote_exists(alice.id, poll.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_option_cap_across_services() {
    let services = services();
    let user = services
        .users
        .create_user("alice", "alice@example.com", "password123")
        .await
        .unwrap();
    let poll = services
        .polls
        .create_poll(user.id, "Lunch?", "")
        .await
        .unwrap();

    for i in 0..NUM_POLL_OPTIONS {
        services
            .poll_options
            .create_poll_option(poll.id, &format!("option {i}"))
            .await
            .unwrap();
    }
    let err = services
        .poll_options
        .create_poll_option(poll.id, "overflow")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_password_reset_flow() {
    let services = services();
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
    // re-requesting returns the same token
    let again = services
        .password_resets
        .create("alice@example.com")
        .await
        .unwrap();
    assert_eq!(token.id, again.id);

    services
        .password_resets
        .redeem(&token.id, "brand-new-password")
        .await
        .unwrap();

    services
        .users
        .login("alice@example.com", "brand-new-password")
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
async fn test_deleting_user_removes_their_footprint() {
    let services = services();
    let alice = services
        .users
        .create_user("alice", "alice@example.com", "password123")
        .await
        .unwrap();
    let bob = services
        .users
        .create_user("bob", "bob@example.com", "password456")
        .await
        .unwrap();

    let poll = services
        .polls
        .create_poll(alice.id, "Lunch?", "")
        .await
        .unwrap();
    let option = services
        .poll_options
        .create_poll_option(poll.id, "pizza")
        .await
        .unwrap();
    services.poll_votes.vote(bob.id, option.id).await.unwrap();
    let session = services
        .users
        .login("alice@example.com", "password123")
        .await
        .unwrap();

    services.users.delete_user(alice.id).await.unwrap();

    assert!(!services.users.user_exists(alice.id).await.unwrap());
    assert!(!services.sessions.session_exists(&session.id).await.unwrap());
    // alice's poll goes, taking bob's vote with it
    assert!(!services.polls.poll_exists(poll.id).await.unwrap());
    assert!(!services
        .poll_votes
        .poll_vote_exists(bob.id, poll.id)
        .await
        .unwrap());
    // bob himself is untouched
    assert!(services.users.user_exists(bob.id).await.unwrap());
}
