//! Caller identity for catalog requests.
//!
//! Modules do not depend on any specific token format. They only know
//! [`Authenticator`], which turns request headers into a [`Principal`].
//! The concrete implementation is injected at startup time.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque user identifier, as known to the classification authority.
    pub user_id: String,
    /// Exempt from every classification and privilege check.
    #[serde(default)]
    pub sys_admin: bool,
}

impl Principal {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            sys_admin: false,
        }
    }

    pub fn sys_admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            sys_admin: true,
        }
    }
}

/// Pluggable authenticator, called once per request by the module
/// middleware.
pub trait Authenticator: Send + Sync + 'static {
    /// Identify the caller from the request headers.
    ///
    /// Returns `Err(ServiceError::Unauthorized)` when no identity can be
    /// established.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ServiceError>;
}
