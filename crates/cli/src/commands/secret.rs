//! Signing secret generation.
//!
//! ```bash
//! echo "JWT_SECRET=$(custgate secret)" >> .env
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Random bytes per secret; encodes to 64 characters.
const SECRET_BYTES: usize = 48;

/// Generate a URL-safe secret that passes the server's strength checks.
#[must_use]
pub fn generate() -> String {
    let bytes: [u8; SECRET_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secrets_are_long_and_distinct() {
        let a = generate();
        let b = generate();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(
            a.bytes()
                .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        );
    }
}
