// ============================
// greenpoll-backend-lib/src/store/memory.rs
// ============================

//! In-memory implementation of the [`RecordStore`] trait.
//!
//! All seven record families live behind a single async mutex, so each
//! operation executes atomically. That lock is what makes the
//! check-then-act patterns in the service layer safe: the vote replace,
//! the poll option cap, and the username/email uniqueness checks are
//! all re-validated here under the lock, which is the authoritative
//! guard.
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{RecordStore, Row, StoreError};

/// Maximum number of options per poll, enforced at insert time.
const MAX_POLL_OPTIONS: usize = 5;

/// Current unix time in seconds.
fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Serialize)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    verified: bool,
    join_time: i64,
}

#[derive(Debug, Clone, Serialize)]
struct SessionRow {
    id: String,
    user_id: i64,
    create_time: i64,
}

#[derive(Debug, Clone, Serialize)]
struct TokenRow {
    id: String,
    email: String,
    create_time: i64,
}

#[derive(Debug, Clone, Serialize)]
struct PollRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    create_time: i64,
}

#[derive(Debug, Clone, Serialize)]
struct PollOptionRow {
    id: i64,
    poll_id: i64,
    value: String,
}

#[derive(Debug, Clone, Serialize)]
struct VoteRow {
    id: i64,
    user_id: i64,
    poll_id: i64,
    poll_option_id: i64,
    vote_time: i64,
}

/// The two token tables share one row shape and one set of operations.
#[derive(Clone, Copy)]
enum TokenTable {
    Verification,
    PasswordReset,
}

#[derive(Default)]
struct Tables {
    next_user_id: i64,
    next_poll_id: i64,
    next_option_id: i64,
    next_vote_id: i64,
    users: Vec<UserRow>,
    sessions: Vec<SessionRow>,
    verifications: Vec<TokenRow>,
    password_resets: Vec<TokenRow>,
    polls: Vec<PollRow>,
    options: Vec<PollOptionRow>,
    votes: Vec<VoteRow>,
}

/// In-memory record store.
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn execute(&self, op: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.dispatch(op, params)
    }
}

fn str_param(params: &[Value], idx: usize) -> Result<String, StoreError> {
    params
        .get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidParameters(format!("expected string at index {idx}")))
}

fn i64_param(params: &[Value], idx: usize) -> Result<i64, StoreError> {
    params
        .get(idx)
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::InvalidParameters(format!("expected integer at index {idx}")))
}

fn bool_param(params: &[Value], idx: usize) -> Result<bool, StoreError> {
    params
        .get(idx)
        .and_then(Value::as_bool)
        .ok_or_else(|| StoreError::InvalidParameters(format!("expected boolean at index {idx}")))
}

fn to_row<T: Serialize>(item: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(item)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidParameters(
            "row did not serialize to an object".to_string(),
        )),
    }
}

fn to_rows<'a, T, I>(items: I) -> Result<Vec<Row>, StoreError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items.into_iter().map(to_row).collect()
}

impl Tables {
    fn dispatch(&mut self, op: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        if let Some(name) = op.strip_prefix("verify/") {
            return self.token_op(TokenTable::Verification, name, params);
        }
        if let Some(name) = op.strip_prefix("password_reset/") {
            return self.token_op(TokenTable::PasswordReset, name, params);
        }

        match op {
            "user/create_user" => self.create_user(params),
            "user/get_user" => {
                let id = i64_param(params, 0)?;
                to_rows(self.users.iter().filter(|u| u.id == id))
            },
            "user/get_user_by_username" => {
                let username = str_param(params, 0)?;
                to_rows(self.users.iter().filter(|u| u.username == username))
            },
            "user/get_user_by_email" => {
                let email = str_param(params, 0)?;
                to_rows(self.users.iter().filter(|u| u.email == email))
            },
            "user/set_username" => self.set_username(params),
            "user/set_email" => self.set_email(params),
            "user/set_password" => {
                let password = str_param(params, 0)?;
                let id = i64_param(params, 1)?;
                if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
                    user.password = password;
                }
                Ok(vec![])
            },
            "user/set_verified" => {
                let verified = bool_param(params, 0)?;
                let id = i64_param(params, 1)?;
                if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
                    user.verified = verified;
                }
                Ok(vec![])
            },
            "user/delete_user" => {
                let id = i64_param(params, 0)?;
                self.delete_user_cascade(id);
                Ok(vec![])
            },
            "user/prune_unverified_users" => {
                let ttl_secs = i64_param(params, 0)?;
                let cutoff = now() - ttl_secs;
                let stale: Vec<i64> = self
                    .users
                    .iter()
                    .filter(|u| !u.verified && u.join_time <= cutoff)
                    .map(|u| u.id)
                    .collect();
                for id in stale {
                    self.delete_user_cascade(id);
                }
                Ok(vec![])
            },
            "user/get_user_polls" => {
                let user_id = i64_param(params, 0)?;
                to_rows(self.polls.iter().filter(|p| p.user_id == user_id))
            },
            "user/get_user_vote_polls" => {
                let user_id = i64_param(params, 0)?;
                to_rows(self.polls.iter().filter(|p| {
                    self.votes
                        .iter()
                        .any(|v| v.user_id == user_id && v.poll_id == p.id)
                }))
            },

            "session/create_session" => self.create_session(params),
            "session/get_session" => {
                let id = str_param(params, 0)?;
                to_rows(self.sessions.iter().filter(|s| s.id == id))
            },
            "session/get_user_by_session_id" => {
                let id = str_param(params, 0)?;
                let user_id = self.sessions.iter().find(|s| s.id == id).map(|s| s.user_id);
                to_rows(
                    self.users
                        .iter()
                        .filter(|u| Some(u.id) == user_id),
                )
            },
            "session/get_user_sessions" => {
                let user_id = i64_param(params, 0)?;
                to_rows(self.sessions.iter().filter(|s| s.user_id == user_id))
            },
            "session/delete_session" => {
                let id = str_param(params, 0)?;
                self.sessions.retain(|s| s.id != id);
                Ok(vec![])
            },
            "session/delete_user_sessions" => {
                let user_id = i64_param(params, 0)?;
                self.sessions.retain(|s| s.user_id != user_id);
                Ok(vec![])
            },
            "session/delete_old_user_sessions" => {
                let user_id = i64_param(params, 0)?;
                let keep = i64_param(params, 1)?.max(0) as usize;
                self.evict_old_sessions(user_id, keep);
                Ok(vec![])
            },

            "poll/create_poll" => self.create_poll(params),
            "poll/get_poll" => {
                let id = i64_param(params, 0)?;
                to_rows(self.polls.iter().filter(|p| p.id == id))
            },
            "poll/get_poll_options" => {
                let poll_id = i64_param(params, 0)?;
                to_rows(self.options.iter().filter(|o| o.poll_id == poll_id))
            },
            "poll/get_poll_votes" => {
                let poll_id = i64_param(params, 0)?;
                to_rows(self.votes.iter().filter(|v| v.poll_id == poll_id))
            },
            "poll/get_poll_voters" => self.get_poll_voters(params),
            "poll/set_title" => {
                let title = str_param(params, 0)?;
                let id = i64_param(params, 1)?;
                if let Some(poll) = self.polls.iter_mut().find(|p| p.id == id) {
                    poll.title = title;
                }
                Ok(vec![])
            },
            "poll/set_description" => {
                let description = str_param(params, 0)?;
                let id = i64_param(params, 1)?;
                if let Some(poll) = self.polls.iter_mut().find(|p| p.id == id) {
                    poll.description = description;
                }
                Ok(vec![])
            },
            "poll/delete_poll" => {
                let id = i64_param(params, 0)?;
                self.delete_poll_cascade(id);
                Ok(vec![])
            },

            "poll_option/create_poll_option" => self.create_poll_option(params),
            "poll_option/get_poll_option" => {
                let id = i64_param(params, 0)?;
                to_rows(self.options.iter().filter(|o| o.id == id))
            },
            "poll_option/get_poll_option_poll" => {
                let id = i64_param(params, 0)?;
                let poll_id = self.options.iter().find(|o| o.id == id).map(|o| o.poll_id);
                to_rows(self.polls.iter().filter(|p| Some(p.id) == poll_id))
            },
            "poll_option/set_poll_option_value" => {
                let value = str_param(params, 0)?;
                let id = i64_param(params, 1)?;
                if let Some(option) = self.options.iter_mut().find(|o| o.id == id) {
                    option.value = value;
                }
                Ok(vec![])
            },
            "poll_option/delete_poll_option" => {
                let id = i64_param(params, 0)?;
                self.options.retain(|o| o.id != id);
                self.votes.retain(|v| v.poll_option_id != id);
                Ok(vec![])
            },

            "poll_vote/vote" => self.vote(params),
            "poll_vote/get_poll_vote" => {
                let user_id = i64_param(params, 0)?;
                let poll_id = i64_param(params, 1)?;
                to_rows(
                    self.votes
                        .iter()
                        .filter(|v| v.user_id == user_id && v.poll_id == poll_id),
                )
            },
            "poll_vote/get_poll_vote_by_vote_id" => {
                let id = i64_param(params, 0)?;
                to_rows(self.votes.iter().filter(|v| v.id == id))
            },
            "poll_vote/get_poll_vote_poll" => {
                let id = i64_param(params, 0)?;
                let poll_id = self.votes.iter().find(|v| v.id == id).map(|v| v.poll_id);
                to_rows(self.polls.iter().filter(|p| Some(p.id) == poll_id))
            },
            "poll_vote/unvote" => {
                let user_id = i64_param(params, 0)?;
                let poll_id = i64_param(params, 1)?;
                self.votes
                    .retain(|v| !(v.user_id == user_id && v.poll_id == poll_id));
                Ok(vec![])
            },
            "poll_vote/unvote_by_poll_option_id" => {
                let user_id = i64_param(params, 0)?;
                let option_id = i64_param(params, 1)?;
                self.votes
                    .retain(|v| !(v.user_id == user_id && v.poll_option_id == option_id));
                Ok(vec![])
            },

            other => Err(StoreError::UnknownOperation(other.to_string())),
        }
    }

    fn create_user(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let username = str_param(params, 0)?;
        let email = str_param(params, 1)?;
        let password = str_param(params, 2)?;

        if self.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Constraint("username already in use".to_string()));
        }
        if self.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Constraint("email already in use".to_string()));
        }

        self.next_user_id += 1;
        let user = UserRow {
            id: self.next_user_id,
            username,
            email,
            password,
            verified: false,
            join_time: now(),
        };
        let row = to_row(&user)?;
        self.users.push(user);
        Ok(vec![row])
    }

    fn set_username(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let username = str_param(params, 0)?;
        let id = i64_param(params, 1)?;
        // uniqueness check does not exclude the caller's own row
        if self.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Constraint("username already in use".to_string()));
        }
        if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
            user.username = username;
        }
        Ok(vec![])
    }

    fn set_email(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let email = str_param(params, 0)?;
        let id = i64_param(params, 1)?;
        if self.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Constraint("email already in use".to_string()));
        }
        if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
            user.email = email;
        }
        Ok(vec![])
    }

    fn delete_user_cascade(&mut self, id: i64) {
        let email = match self.users.iter().find(|u| u.id == id) {
            Some(user) => user.email.clone(),
            None => return,
        };
        self.sessions.retain(|s| s.user_id != id);
        self.votes.retain(|v| v.user_id != id);
        self.verifications.retain(|t| t.email != email);
        self.password_resets.retain(|t| t.email != email);
        let owned: Vec<i64> = self
            .polls
            .iter()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for poll_id in owned {
            self.delete_poll_cascade(poll_id);
        }
        self.users.retain(|u| u.id != id);
    }

    fn delete_poll_cascade(&mut self, id: i64) {
        self.options.retain(|o| o.poll_id != id);
        self.votes.retain(|v| v.poll_id != id);
        self.polls.retain(|p| p.id != id);
    }

    fn create_session(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let id = str_param(params, 0)?;
        let user_id = i64_param(params, 1)?;
        if !self.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::Constraint("user does not exist".to_string()));
        }
        if self.sessions.iter().any(|s| s.id == id) {
            return Err(StoreError::Constraint("session id already in use".to_string()));
        }
        let session = SessionRow {
            id,
            user_id,
            create_time: now(),
        };
        let row = to_row(&session)?;
        self.sessions.push(session);
        Ok(vec![row])
    }

    /// Sessions are stored in creation order, so eviction by count is a
    /// matter of dropping the first rows for the user beyond the cap.
    fn evict_old_sessions(&mut self, user_id: i64, keep: usize) {
        let ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id.clone())
            .collect();
        let excess = ids.len().saturating_sub(keep);
        for id in ids.into_iter().take(excess) {
            self.sessions.retain(|s| s.id != id);
        }
    }

    fn token_op(
        &mut self,
        table: TokenTable,
        name: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, StoreError> {
        // `delete_unverified_user` reaches across tables, so handle it
        // before borrowing the token table.
        if let (TokenTable::Verification, "delete_unverified_user") = (table, name) {
            return self.delete_unverified_user(params);
        }

        let tokens = match table {
            TokenTable::Verification => &mut self.verifications,
            TokenTable::PasswordReset => &mut self.password_resets,
        };

        match name {
            "create_token" => {
                let id = str_param(params, 0)?;
                let email = str_param(params, 1)?;
                if tokens.iter().any(|t| t.email == email) {
                    return Err(StoreError::Constraint(
                        "a token already exists for this email".to_string(),
                    ));
                }
                let token = TokenRow {
                    id,
                    email,
                    create_time: now(),
                };
                let row = to_row(&token)?;
                tokens.push(token);
                Ok(vec![row])
            },
            "get_token" => {
                let id = str_param(params, 0)?;
                to_rows(tokens.iter().filter(|t| t.id == id))
            },
            "get_token_by_email" => {
                let email = str_param(params, 0)?;
                to_rows(tokens.iter().filter(|t| t.email == email))
            },
            "get_tokens" => to_rows(tokens.iter()),
            "get_user_by_token" => {
                let id = str_param(params, 0)?;
                let email = tokens.iter().find(|t| t.id == id).map(|t| t.email.clone());
                to_rows(
                    self.users
                        .iter()
                        .filter(|u| Some(&u.email) == email.as_ref()),
                )
            },
            "delete_token" => {
                let id = str_param(params, 0)?;
                tokens.retain(|t| t.id != id);
                Ok(vec![])
            },
            "prune_tokens" => {
                let ttl_secs = i64_param(params, 0)?;
                let cutoff = now() - ttl_secs;
                let pruned: Vec<TokenRow> = tokens
                    .iter()
                    .filter(|t| t.create_time <= cutoff)
                    .cloned()
                    .collect();
                tokens.retain(|t| t.create_time > cutoff);
                to_rows(pruned.iter())
            },
            other => Err(StoreError::UnknownOperation(format!("token op {other}"))),
        }
    }

    /// Deletes a verification token and, if its owner never verified,
    /// the owner as well.
    fn delete_unverified_user(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let id = str_param(params, 0)?;
        let email = match self.verifications.iter().find(|t| t.id == id) {
            Some(token) => token.email.clone(),
            None => return Ok(vec![]),
        };
        self.verifications.retain(|t| t.id != id);
        let stale = self
            .users
            .iter()
            .find(|u| u.email == email && !u.verified)
            .map(|u| u.id);
        if let Some(user_id) = stale {
            self.delete_user_cascade(user_id);
        }
        Ok(vec![])
    }

    fn create_poll(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let user_id = i64_param(params, 0)?;
        let title = str_param(params, 1)?;
        let description = str_param(params, 2)?;
        if !self.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::Constraint("user does not exist".to_string()));
        }
        self.next_poll_id += 1;
        let poll = PollRow {
            id: self.next_poll_id,
            user_id,
            title,
            description,
            create_time: now(),
        };
        let row = to_row(&poll)?;
        self.polls.push(poll);
        Ok(vec![row])
    }

    fn create_poll_option(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let poll_id = i64_param(params, 0)?;
        let value = str_param(params, 1)?;
        if !self.polls.iter().any(|p| p.id == poll_id) {
            return Err(StoreError::Constraint("poll does not exist".to_string()));
        }
        let count = self.options.iter().filter(|o| o.poll_id == poll_id).count();
        if count >= MAX_POLL_OPTIONS {
            return Err(StoreError::Constraint("poll option limit reached".to_string()));
        }
        self.next_option_id += 1;
        let option = PollOptionRow {
            id: self.next_option_id,
            poll_id,
            value,
        };
        let row = to_row(&option)?;
        self.options.push(option);
        Ok(vec![row])
    }

    /// Atomic replace: any prior vote by this user on this poll is
    /// removed in the same lock acquisition that inserts the new one,
    /// so two surviving rows for one (user, poll) pair are impossible.
    fn vote(&mut self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let user_id = i64_param(params, 0)?;
        let poll_id = i64_param(params, 1)?;
        let option_id = i64_param(params, 2)?;
        if !self.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::Constraint("user does not exist".to_string()));
        }
        if !self
            .options
            .iter()
            .any(|o| o.id == option_id && o.poll_id == poll_id)
        {
            return Err(StoreError::Constraint(
                "poll option does not belong to poll".to_string(),
            ));
        }
        self.votes
            .retain(|v| !(v.user_id == user_id && v.poll_id == poll_id));
        self.next_vote_id += 1;
        let vote = VoteRow {
            id: self.next_vote_id,
            user_id,
            poll_id,
            poll_option_id: option_id,
            vote_time: now(),
        };
        let row = to_row(&vote)?;
        self.votes.push(vote);
        Ok(vec![row])
    }

    fn get_poll_voters(&self, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        #[derive(Serialize)]
        struct PollVoterRow<'a> {
            user_id: i64,
            username: &'a str,
            poll_option_id: i64,
            poll_option_value: &'a str,
            vote_time: i64,
        }

        let poll_id = i64_param(params, 0)?;
        let mut rows = Vec::new();
        for vote in self.votes.iter().filter(|v| v.poll_id == poll_id) {
            let user = self.users.iter().find(|u| u.id == vote.user_id);
            let option = self.options.iter().find(|o| o.id == vote.poll_option_id);
            if let (Some(user), Some(option)) = (user, option) {
                rows.push(to_row(&PollVoterRow {
                    user_id: user.id,
                    username: &user.username,
                    poll_option_id: option.id,
                    poll_option_value: &option.value,
                    vote_time: vote.vote_time,
                })?);
            }
        }
        Ok(rows)
    }
}
