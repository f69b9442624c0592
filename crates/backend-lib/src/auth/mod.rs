// ============================
// greenpoll-backend-lib/src/auth/mod.rs
// ============================

//! Password hashing and identifier generation.

pub mod password;
pub mod token;

pub use password::{hash_password_secure, verify_password, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
pub use token::generate_secure_token;
