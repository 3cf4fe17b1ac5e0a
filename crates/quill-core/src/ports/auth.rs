//! Authentication ports - token lifecycle and password hashing.

use async_trait::async_trait;
use uuid::Uuid;

/// Claims carried by a validated access token.
#[derive(Debug, Clone)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub username: String,
    pub exp: i64,
}

/// An access/refresh token pair as returned by `POST /api/token`.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token service trait covering the whole session lifecycle.
///
/// Refresh tokens move through `issued -> blacklisted` or
/// `issued -> expired`; both terminal states reject every further use.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Issue an access/refresh pair for an authenticated user.
    fn issue_pair(&self, user_id: Uuid, username: &str) -> Result<TokenPair, AuthError>;

    /// Validate and decode an access token.
    fn validate_access(&self, token: &str) -> Result<AccessClaims, AuthError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError>;

    /// Revoke a refresh token permanently. Revoking an already revoked
    /// token fails with [`AuthError::Revoked`].
    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError>;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has been revoked")]
    Revoked,

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Hashing error: {0}")]
    HashingError(String),

    #[error("Token store error: {0}")]
    Store(String),
}
