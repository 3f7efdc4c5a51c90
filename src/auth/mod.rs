//! Bearer-token validation for endpoints that need an authenticated user.
//!
//! User management (registration, login, password reset) lives in an external
//! auth provider that shares the HS256 signing secret with this service; all
//! this module does is validate the tokens that provider issues.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::ServiceError;

/// JWT validation settings.
#[derive(Clone)]
pub struct AuthConfig {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthConfig {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

/// Claims issued by the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Opaque user id
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Validates bearer tokens. Injected into request extensions by a router
/// layer so extractors can reach it.
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.config.decoding_key, &self.config.validation)
            .map(|data| data.claims)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
    }
}

/// Extractor for handlers that require an authenticated user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| {
                ServiceError::InternalError("auth service not configured".to_string())
            })?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let claims = auth_service.validate_token(token)?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit_test_secret_that_is_long_enough_1234";

    fn token(iss: &str, aud: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            email: Some("user@example.com".into()),
            iat: now,
            exp: now + exp_offset_secs,
            iss: iss.into(),
            aud: aud.into(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encode token")
    }

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(SECRET, "hostdeck-auth", "hostdeck-api"))
    }

    #[test]
    fn valid_token_yields_claims() {
        let claims = service()
            .validate_token(&token("hostdeck-auth", "hostdeck-api", 3600))
            .expect("token should validate");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let result = service().validate_token(&token("someone-else", "hostdeck-api", 3600));
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let result = service().validate_token(&token("hostdeck-auth", "other-api", 3600));
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let result = service().validate_token(&token("hostdeck-auth", "hostdeck-api", -3600));
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }
}
