// ============================
// greenpoll-backend-lib/src/metrics.rs
// ============================

//! Central place for metric keys
pub const USER_CREATED: &str = "user.created";
pub const SESSION_CREATED: &str = "session.created";
pub const VOTE_CAST: &str = "poll_vote.cast";
pub const TOKEN_CREATED: &str = "token.created";
pub const TOKEN_REDEEMED: &str = "token.redeemed";
pub const TOKEN_PRUNED: &str = "token.pruned";
