// ============================
// greenpoll-backend-lib/src/auth/token.rs
// ============================

//! Secure identifier generation for sessions and email tokens.
//!
//! Session ids double as bearer credentials and verification/reset ids
//! are emailed to users, so all of them come from OS entropy rather
//! than anything sequential or guessable.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// Token size in bytes (32 bytes = 256 bits of entropy)
const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure random identifier, encoded as
/// URL-safe base64 without padding.
pub fn generate_secure_token() -> String {
    let mut buffer = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
