//! Bearer-token validation and the [`AuthUser`] extractor.
//!
//! Identity provisioning (signup, login, token issuance) lives in an external
//! identity service; this module only verifies the trusted principal attached
//! to each request. Anonymous callers are rejected with `Unauthorized`.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::ServiceError;

pub const ROLE_ADMIN: &str = "admin";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Validates bearer tokens signed by the identity provider.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(jwt_secret: &str, token_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid bearer token: {}", e)))
    }

    /// Mint a token with this service's secret. The production identity
    /// provider issues real tokens; this is for tooling and tests.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        email: &str,
        name: Option<&str>,
        roles: &[&str],
    ) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("Failed to sign token: {}", e)))
    }
}

/// Authenticated principal extracted from the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
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
                ServiceError::InternalError("AuthService missing from request extensions".into())
            })?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))?;

        let claims = auth_service.validate_token(token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            ServiceError::Unauthorized("Token subject is not a valid user id".into())
        })?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            name: claims.name,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            "a_test_secret_that_is_long_enough_for_validation",
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn token_round_trip() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let token = svc
            .issue_token(user_id, "user@example.com", Some("A User"), &["customer"])
            .unwrap();

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.roles, vec!["customer".to_string()]);
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "user@example.com".to_string(),
            name: None,
            roles: vec![],
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("a_test_secret_that_is_long_enough_for_validation".as_bytes()),
        )
        .unwrap();

        assert!(svc.validate_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(service().validate_token("not-a-jwt").is_err());
    }

    #[test]
    fn admin_role_check() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            email: "staff@example.com".to_string(),
            name: None,
            roles: vec![ROLE_ADMIN.to_string()],
        };
        assert!(user.is_admin());

        let customer = AuthUser {
            user_id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: None,
            roles: vec![],
        };
        assert!(!customer.is_admin());
    }
}
