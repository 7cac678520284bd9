//! Session token signing and verification.
//!
//! Tokens are HS256 JWTs carrying the [`IdentityClaims`] plus `iat`/`exp`.
//! Nothing is stored server-side: a token is valid exactly when its signature
//! matches the configured secret and `exp` has not passed.

use chrono::{DateTime, Duration, Utc};
use custgate_core::IdentityClaims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Session lifetime. Also the session cookie's `Max-Age`.
pub const SESSION_TTL: Duration = Duration::minutes(30);

/// Why a presented token was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidTokenError {
    /// The token is well formed and correctly signed but past `exp`.
    #[error("session token expired")]
    Expired,
    /// The signature does not match the signing secret.
    #[error("session token signature mismatch")]
    BadSignature,
    /// Not a decodable token at all.
    #[error("malformed session token: {0}")]
    Malformed(String),
}

/// Failure to mint a token. Only happens on signing misconfiguration.
#[derive(Debug, Error)]
#[error("failed to sign session token: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

/// A signed session token, ready to be placed in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// The encoded token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// When the token stops verifying.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Take the encoded token.
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

/// On-the-wire JWT body.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    identity: IdentityClaims,
    iat: i64,
    exp: i64,
}

/// Signs and verifies session tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the keys from the configured signing secret.
    #[must_use]
    pub fn new(config: &SecurityConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `identity`, valid for [`SESSION_TTL`] from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if signing fails.
    pub fn issue(&self, identity: &IdentityClaims) -> Result<SessionToken, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Sign `identity` as if issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if signing fails.
    pub fn issue_at(
        &self,
        identity: &IdentityClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<SessionToken, TokenError> {
        let expires_at = issued_at + SESSION_TTL;
        let claims = SessionClaims {
            identity: identity.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let value = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(SessionToken { value, expires_at })
    }

    /// Check a presented token and recover its identity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTokenError` when the token is expired, signed with a
    /// different secret, or not a token at all.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, InvalidTokenError> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.identity)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => InvalidTokenError::Expired,
                ErrorKind::InvalidSignature => InvalidTokenError::BadSignature,
                _ => InvalidTokenError::Malformed(e.to_string()),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&SecurityConfig {
            jwt_secret: SecretString::from(secret.to_owned()),
            cookie_name: "authCookie".to_owned(),
            secure_cookies: false,
        })
    }

    fn john() -> IdentityClaims {
        IdentityClaims::new("@johndoe", "John Doe", "johndoe@mail.com")
    }

    #[test]
    fn test_verify_recovers_issued_identity() {
        let tokens = service("t3st-K3y-0123456789-abcdefghijKLM");
        let token = tokens.issue(&john()).unwrap();
        assert_eq!(tokens.verify(token.as_str()).unwrap(), john());
    }

    #[test]
    fn test_expiry_is_thirty_minutes_after_issue() {
        let tokens = service("t3st-K3y-0123456789-abcdefghijKLM");
        let issued_at = Utc::now();
        let token = tokens.issue_at(&john(), issued_at).unwrap();
        assert_eq!(token.expires_at() - issued_at, Duration::minutes(30));
    }

    #[test]
    fn test_foreign_secret_is_bad_signature() {
        let ours = service("t3st-K3y-0123456789-abcdefghijKLM");
        let theirs = service("0th3r-K3y-9876543210-zyxwvutsrqPON");
        let token = theirs.issue(&john()).unwrap();
        assert_eq!(
            ours.verify(token.as_str()),
            Err(InvalidTokenError::BadSignature)
        );
    }

    #[test]
    fn test_token_older_than_ttl_is_expired() {
        let tokens = service("t3st-K3y-0123456789-abcdefghijKLM");
        let stale = Utc::now() - SESSION_TTL - Duration::seconds(5);
        let token = tokens.issue_at(&john(), stale).unwrap();
        assert_eq!(tokens.verify(token.as_str()), Err(InvalidTokenError::Expired));
    }

    #[test]
    fn test_token_inside_ttl_still_verifies() {
        let tokens = service("t3st-K3y-0123456789-abcdefghijKLM");
        let recent = Utc::now() - Duration::minutes(29);
        let token = tokens.issue_at(&john(), recent).unwrap();
        assert!(tokens.verify(token.as_str()).is_ok());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let tokens = service("t3st-K3y-0123456789-abcdefghijKLM");
        for garbage in ["", "not-a-jwt", "a.b.c"] {
            assert!(matches!(
                tokens.verify(garbage),
                Err(InvalidTokenError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = service("t3st-K3y-0123456789-abcdefghijKLM");
        let token = tokens.issue(&john()).unwrap().into_string();

        let mut parts: Vec<&str> = token.split('.').collect();
        let other = tokens
            .issue(&IdentityClaims::new("@mallory", "Mallory", "m@evil.io"))
            .unwrap()
            .into_string();
        let other_payload = other.split('.').nth(1).unwrap().to_owned();
        parts[1] = &other_payload;
        let forged = parts.join(".");

        assert_eq!(tokens.verify(&forged), Err(InvalidTokenError::BadSignature));
    }
}
