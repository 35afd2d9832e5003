//! JWT bearer authentication.
//!
//! Tokens are issued elsewhere; `videod` only verifies them. The caller's
//! user id is `sub`, and the caller is a sys-admin when `roles` contains
//! the configured sys-admin role.

use axum::http::HeaderMap;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use vidcat_core::{Authenticator, Principal, ServiceError};

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as known to the classification authority.
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
    sys_admin_role: String,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, sys_admin_role: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            sys_admin_role: sys_admin_role.into(),
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ServiceError> {
        let token = extract_bearer(headers)
            .ok_or_else(|| ServiceError::Unauthorized("missing authorization token".into()))?;
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;
        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(ServiceError::Unauthorized("token has no subject".into()));
        }
        Ok(Principal {
            sys_admin: claims.roles.iter().any(|r| *r == self.sys_admin_role),
            user_id: claims.sub,
        })
    }
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
