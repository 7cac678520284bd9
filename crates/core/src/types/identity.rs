//! Identity carried inside a session token.

use serde::{Deserialize, Serialize};

/// The subject a session token speaks for.
///
/// Field names on the wire are `id`, `username` and `email`, matching the
/// JSON payload clients already decode from the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Stable subject identifier (e.g. `@johndoe`).
    #[serde(rename = "id")]
    pub subject_id: String,
    /// Display name.
    #[serde(rename = "username")]
    pub subject_name: String,
    /// Contact email. Kept as a plain string: claims are never re-validated,
    /// only verified by signature.
    #[serde(rename = "email")]
    pub subject_email: String,
}

impl IdentityClaims {
    /// Build claims from their three parts.
    #[must_use]
    pub fn new(
        subject_id: impl Into<String>,
        subject_name: impl Into<String>,
        subject_email: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_name: subject_name.into(),
            subject_email: subject_email.into(),
        }
    }
}
