// ============================
// greenpoll-backend-lib/src/store/mod.rs
// ============================

//! Record store abstraction with an in-memory implementation.
//!
//! Every domain service persists through [`RecordStore`]: a named,
//! parameterized operation goes in, zero or more rows come back. The
//! operation names mirror the seven record families (user, session,
//! verification token, password-reset token, poll, poll option, vote).
//! Hard invariants (uniqueness, the option cap, one vote per user per
//! poll) are enforced inside the store, which is the single source of
//! truth; service-level pre-checks only exist for better error
//! messages.
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub use memory::MemoryStore;

/// A single result row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Failures surfaced by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A store-level invariant (uniqueness, cap, foreign key) rejected
    /// the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("row decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Trait for record store backends
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Execute a named operation with positional parameters, returning
    /// the affected or matching rows.
    async fn execute(&self, op: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;
}

/// Decode raw rows into a typed shape.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(StoreError::from))
        .collect()
}
