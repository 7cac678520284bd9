//! Session token commands.
//!
//! # Usage
//!
//! ```bash
//! custgate token issue --id @ann --username "Ann Lee" --email ann@shop.net
//! custgate token verify <TOKEN>
//! ```
//!
//! # Environment Variables
//!
//! Same as the server: `JWT_SECRET` and `COOKIE_NAME` are required.

use custgate_core::IdentityClaims;
use custgate_server::config::{ConfigError, ServerConfig};
use custgate_server::services::{InvalidTokenError, TokenError, TokenService};
use thiserror::Error;

/// Errors that can occur while handling tokens.
#[derive(Debug, Error)]
pub enum TokenCommandError {
    /// Server configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The token could not be signed.
    #[error(transparent)]
    Signing(#[from] TokenError),

    /// The token did not verify.
    #[error("Token rejected: {0}")]
    Rejected(#[from] InvalidTokenError),

    /// Claims could not be rendered.
    #[error("Failed to render claims: {0}")]
    Render(#[from] serde_json::Error),
}

fn load_service() -> Result<(TokenService, String), TokenCommandError> {
    let config = ServerConfig::from_env()?;
    Ok((
        TokenService::new(&config.security),
        config.security.cookie_name,
    ))
}

/// Sign a session token for the given identity.
///
/// # Errors
///
/// Returns `TokenCommandError` if configuration is missing or signing fails.
pub fn issue(id: &str, username: &str, email: &str) -> Result<String, TokenCommandError> {
    let (tokens, cookie_name) = load_service()?;
    let token = tokens.issue(&IdentityClaims::new(id, username, email))?;

    tracing::info!(
        subject_id = id,
        cookie = %cookie_name,
        expires_at = %token.expires_at(),
        "Session token issued"
    );
    Ok(token.into_string())
}

/// Verify a session token and render its claims as pretty JSON.
///
/// # Errors
///
/// Returns `TokenCommandError::Rejected` with the reason if the token does
/// not verify.
pub fn verify(token: &str) -> Result<String, TokenCommandError> {
    let (tokens, _) = load_service()?;
    let claims = tokens.verify(token)?;
    Ok(serde_json::to_string_pretty(&claims)?)
}
