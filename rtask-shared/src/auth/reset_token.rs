/// Password reset tokens
///
/// # Security
///
/// - **Format**: 32 random bytes, hex encoded (64 chars)
/// - **Storage**: only the SHA-256 hex digest is persisted
/// - **Lifetime**: single use, expires after a configurable window
///
/// # Example
///
/// ```
/// use rtask_shared::auth::reset_token::{generate_reset_token, hash_reset_token};
///
/// let (token, digest) = generate_reset_token();
/// assert_eq!(token.len(), 64);
/// assert_eq!(hash_reset_token(&token), digest);
/// ```

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token
const TOKEN_BYTES: usize = 32;

/// Generates a new reset token
///
/// Returns (plaintext_token, sha256_hex). The plaintext goes into the emailed
/// link and is never stored.
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let token = hex::encode(bytes);
    let digest = hash_reset_token(&token);

    (token, digest)
}

/// SHA-256 hex digest of a presented token
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
