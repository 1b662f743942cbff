//! JWT service for token generation and validation
//!
//! Tokens are signed with HS256 and a shared secret. Validation errors are
//! typed so the middleware can answer differently for expired and malformed
//! tokens.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Role, User};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Token expiration time in seconds (default: 24 hours)
    pub expiry_seconds: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: shared signing secret (required)
    /// - `JWT_EXPIRY_SECONDS`: token expiry in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let expiry_seconds = std::env::var("JWT_EXPIRY_SECONDS")
            .unwrap_or_else(|_| "86400".to_string()) // 24 hours
            .parse()
            .unwrap_or(86400);

        Ok(JwtConfig {
            secret,
            expiry_seconds,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// User role
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Token validation failure, split by cause
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthTokenError {
    /// Token is not a structurally valid JWT
    #[error("token is malformed")]
    Malformed,
    /// Token was valid once but its expiry has passed
    #[error("token has expired")]
    Expired,
    /// Signature does not match the configured secret
    #[error("token signature is invalid")]
    InvalidSignature,
    /// Anything else jsonwebtoken reports
    #[error("token validation failed: {0}")]
    Other(String),
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate a token carrying the user's id, email and role
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.config.expiry_seconds,
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthTokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(map_validation_error)?;
        Ok(token_data.claims)
    }
}

fn map_validation_error(e: jsonwebtoken::errors::Error) -> AuthTokenError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::ExpiredSignature => AuthTokenError::Expired,
        ErrorKind::InvalidSignature => AuthTokenError::InvalidSignature,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthTokenError::Malformed
        }
        _ => AuthTokenError::Other(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_service(secret: &str) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            expiry_seconds: 3600,
        })
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Customer,
            profile_photo: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_validate_round_trip() {
        let service = test_service("test-secret");
        let user = test_user();

        let token = service.generate_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let service = test_service("test-secret");
        let user = test_user();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(
            service.validate_token(&token),
            Err(AuthTokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret_is_reported_as_invalid_signature() {
        let service = test_service("test-secret");
        let other = test_service("other-secret");
        let user = test_user();

        let token = other.generate_token(&user).unwrap();

        assert_eq!(
            service.validate_token(&token),
            Err(AuthTokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_token_is_reported_as_malformed() {
        let service = test_service("test-secret");

        let result = service.validate_token("definitely.not-a-jwt");
        assert_eq!(result, Err(AuthTokenError::Malformed));
    }

    #[test]
    fn test_expired_and_malformed_are_distinguishable() {
        let malformed = AuthTokenError::Malformed;
        let expired = AuthTokenError::Expired;

        assert_ne!(malformed, expired);
        assert_ne!(malformed.to_string(), expired.to_string());
    }
}
