//! Anti-forgery tokens bound to a per-client secret cookie.
//!
//! The secret never leaves the `_csrf` cookie. Clients receive a salted token
//! `"{salt}-{mac}"` where `mac = base64url(HMAC-SHA256(secret, salt))` and
//! must echo it on every state-changing request. Validation recomputes the
//! MAC from the secret cookie and compares in constant time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Cookie holding the per-client secret.
pub const CSRF_SECRET_COOKIE: &str = "_csrf";

/// Cookie exposing the derived token to client scripts.
pub const CSRF_TOKEN_COOKIE: &str = "xsrf-token";

/// Headers the client may echo the token in, checked in order after the
/// form body and query string.
pub const CSRF_TOKEN_HEADERS: &[&str] =
    &["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

/// Form field and query parameter carrying the token.
pub const CSRF_QUERY_PARAM: &str = "_csrf";

const SECRET_BYTES: usize = 18;
const SALT_LENGTH: usize = 8;

/// Rejection reasons for a state-changing request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CsrfError {
    /// No `_csrf` secret cookie on the request.
    #[error("missing csrf secret")]
    MissingSecret,
    /// The client did not send a token.
    #[error("missing csrf token")]
    MissingToken,
    /// The token is not `salt-mac` shaped.
    #[error("malformed csrf token")]
    MalformedToken,
    /// The token was not derived from this client's secret.
    #[error("invalid csrf token")]
    Mismatch,
}

/// A per-client secret, stored only in the `_csrf` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfSecret(String);

impl CsrfSecret {
    /// Accept a secret read back from a cookie. Anything that does not decode
    /// to the expected length is discarded so a fresh one is issued.
    #[must_use]
    pub fn from_cookie(value: &str) -> Option<Self> {
        let decoded = URL_SAFE_NO_PAD.decode(value).ok()?;
        (decoded.len() == SECRET_BYTES).then(|| Self(value.to_owned()))
    }

    /// Cookie value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A client-visible token derived from a [`CsrfSecret`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Cookie/header value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues and validates anti-forgery tokens. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfGuard;

impl CsrfGuard {
    /// Generate a fresh random secret.
    #[must_use]
    pub fn issue_secret(&self) -> CsrfSecret {
        let bytes: [u8; SECRET_BYTES] = rand::rng().random();
        CsrfSecret(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Derive a new salted token from `secret`. Every call yields a
    /// different token; all of them validate against the same secret.
    ///
    /// # Errors
    ///
    /// Returns `CsrfError::Mismatch` if the secret cannot key the MAC.
    pub fn issue_token(&self, secret: &CsrfSecret) -> Result<CsrfToken, CsrfError> {
        let salt: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(SALT_LENGTH)
            .map(char::from)
            .collect();
        let mac = keyed(secret)?.chain_update(salt.as_bytes()).finalize();
        let mac = URL_SAFE_NO_PAD.encode(mac.into_bytes());
        Ok(CsrfToken(format!("{salt}-{mac}")))
    }

    /// Check a client-supplied token against the secret cookie.
    ///
    /// # Errors
    ///
    /// Returns `CsrfError` when either side is missing, the token is not
    /// well formed, or it was derived from a different secret.
    pub fn validate(
        &self,
        secret: Option<&CsrfSecret>,
        token: Option<&str>,
    ) -> Result<(), CsrfError> {
        let secret = secret.ok_or(CsrfError::MissingSecret)?;
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(CsrfError::MissingToken)?;

        let (salt, mac) = token.split_once('-').ok_or(CsrfError::MalformedToken)?;
        if salt.len() != SALT_LENGTH || !salt.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CsrfError::MalformedToken);
        }
        let mac = URL_SAFE_NO_PAD
            .decode(mac)
            .map_err(|_| CsrfError::MalformedToken)?;

        keyed(secret)?
            .chain_update(salt.as_bytes())
            .verify_slice(&mac)
            .map_err(|_| CsrfError::Mismatch)
    }
}

/// MAC keyed by the client secret.
fn keyed(secret: &CsrfSecret) -> Result<HmacSha256, CsrfError> {
    let Ok(mac) = HmacSha256::new_from_slice(secret.0.as_bytes()) else {
        return Err(CsrfError::Mismatch);
    };
    Ok(mac)
}
