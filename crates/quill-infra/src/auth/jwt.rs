//! JWT session tokens: access/refresh pair issuance, refresh rotation, and
//! refresh-token revocation against the blacklist port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::ports::{AccessClaims, AuthError, TokenBlacklist, TokenPair, TokenService};

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_minutes: i64,
    pub refresh_days: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_minutes: 15,
            refresh_days: 7,
            issuer: "quill-api".to_string(),
        }
    }
}

/// Internal JWT claims structure for serialization.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    username: String,
    typ: String, // "access" or "refresh"
    jti: String, // revocation key for refresh tokens
    exp: i64,    // expiration timestamp
    iat: i64,    // issued at
    iss: String, // issuer
}

/// JWT-based token service. Refresh tokens carry a `jti` claim that the
/// blacklist records on revocation; access tokens are never blacklisted and
/// simply age out.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
    blacklist: Arc<dyn TokenBlacklist>,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig, blacklist: Arc<dyn TokenBlacklist>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            encoding_key,
            decoding_key,
            config,
            blacklist,
        }
    }

    pub fn from_env(blacklist: Arc<dyn TokenBlacklist>) -> Self {
        let secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-in-production".to_string());

        // Warn if using default secret in production
        if secret == "change-me-in-production" {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
            }
        }

        let config = JwtConfig {
            secret,
            access_minutes: std::env::var("JWT_ACCESS_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            refresh_days: std::env::var("JWT_REFRESH_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(7),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "quill-api".to_string()),
        };
        Self::new(config, blacklist)
    }

    fn encode_token(
        &self,
        user_id: Uuid,
        username: &str,
        typ: &str,
        lifetime: TimeDelta,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            typ: typ.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn decode_token(&self, token: &str, expected_typ: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if token_data.claims.typ != expected_typ {
            return Err(AuthError::InvalidToken(format!(
                "expected {expected_typ} token"
            )));
        }

        Ok(token_data.claims)
    }

    /// Decode a refresh token and pull out its revocation key and expiry.
    fn refresh_claims(&self, token: &str) -> Result<(Claims, Uuid, DateTime<Utc>), AuthError> {
        let claims = self.decode_token(token, TOKEN_TYPE_REFRESH)?;
        let jti =
            Uuid::parse_str(&claims.jti).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken("bad exp claim".to_string()))?;
        Ok((claims, jti, expires_at))
    }
}

#[async_trait]
impl TokenService for JwtTokenService {
    fn issue_pair(&self, user_id: Uuid, username: &str) -> Result<TokenPair, AuthError> {
        let access = self.encode_token(
            user_id,
            username,
            TOKEN_TYPE_ACCESS,
            TimeDelta::minutes(self.config.access_minutes),
        )?;
        let refresh = self.encode_token(
            user_id,
            username,
            TOKEN_TYPE_REFRESH,
            TimeDelta::days(self.config.refresh_days),
        )?;

        Ok(TokenPair { access, refresh })
    }

    fn validate_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims = self.decode_token(token, TOKEN_TYPE_ACCESS)?;

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(AccessClaims {
            user_id,
            username: claims.username,
            exp: claims.exp,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let (claims, jti, _) = self.refresh_claims(refresh_token)?;

        if self
            .blacklist
            .is_revoked(jti)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
        {
            return Err(AuthError::Revoked);
        }

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        self.encode_token(
            user_id,
            &claims.username,
            TOKEN_TYPE_ACCESS,
            TimeDelta::minutes(self.config.access_minutes),
        )
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let (claims, jti, expires_at) = self.refresh_claims(refresh_token)?;

        let newly_revoked = self
            .blacklist
            .revoke(jti, expires_at)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        if !newly_revoked {
            return Err(AuthError::Revoked);
        }

        tracing::debug!(user = %claims.username, "refresh token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn test_service() -> JwtTokenService {
        let config = JwtConfig {
            secret: "test-secret-key".to_string(),
            access_minutes: 15,
            refresh_days: 1,
            issuer: "test-issuer".to_string(),
        };
        JwtTokenService::new(config, Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn issue_pair_produces_both_tokens() {
        let service = test_service();
        let pair = service.issue_pair(Uuid::new_v4(), "alice").unwrap();

        assert!(!pair.access.is_empty());
        assert!(!pair.refresh.is_empty());
        assert_ne!(pair.access, pair.refresh);
    }

    #[test]
    fn validate_access_round_trips_claims() {
        let service = test_service();
        let user_id = Uuid::new_v4();

        let pair = service.issue_pair(user_id, "alice").unwrap();
        let claims = service.validate_access(&pair.access).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn refresh_token_is_rejected_as_access_token() {
        let service = test_service();
        let pair = service.issue_pair(Uuid::new_v4(), "alice").unwrap();

        let result = service.validate_access(&pair.refresh);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn validate_garbage_token() {
        let service = test_service();

        let result = service.validate_access("not-a-token");
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn validate_wrong_issuer_token() {
        let service1 = JwtTokenService::new(
            JwtConfig {
                secret: "same-secret".to_string(),
                issuer: "issuer1".to_string(),
                ..JwtConfig::default()
            },
            Arc::new(InMemoryStore::new()),
        );
        let service2 = JwtTokenService::new(
            JwtConfig {
                secret: "same-secret".to_string(),
                issuer: "issuer2".to_string(),
                ..JwtConfig::default()
            },
            Arc::new(InMemoryStore::new()),
        );

        let pair = service1.issue_pair(Uuid::new_v4(), "alice").unwrap();

        assert!(service2.validate_access(&pair.access).is_err());
    }

    #[tokio::test]
    async fn refresh_yields_new_access_token() {
        let service = test_service();
        let user_id = Uuid::new_v4();
        let pair = service.issue_pair(user_id, "alice").unwrap();

        let access = service.refresh(&pair.refresh).await.unwrap();
        let claims = service.validate_access(&access).unwrap();

        assert_eq!(claims.user_id, user_id);
    }

    #[tokio::test]
    async fn access_token_cannot_be_used_to_refresh() {
        let service = test_service();
        let pair = service.issue_pair(Uuid::new_v4(), "alice").unwrap();

        let result = service.refresh(&pair.access).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn revoked_token_cannot_refresh() {
        let service = test_service();
        let pair = service.issue_pair(Uuid::new_v4(), "alice").unwrap();

        service.revoke(&pair.refresh).await.unwrap();

        let result = service.refresh(&pair.refresh).await;
        assert!(matches!(result, Err(AuthError::Revoked)));
    }

    #[tokio::test]
    async fn double_revoke_reports_already_revoked() {
        let service = test_service();
        let pair = service.issue_pair(Uuid::new_v4(), "alice").unwrap();

        service.revoke(&pair.refresh).await.unwrap();

        let result = service.revoke(&pair.refresh).await;
        assert!(matches!(result, Err(AuthError::Revoked)));
    }
}
