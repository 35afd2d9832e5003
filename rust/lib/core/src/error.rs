use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Codes carried in the `code` field of every error body.
///
/// A client deciding between "this video does not exist" and "you may not
/// see this video" reads `code`; `message` is for humans and may change.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const INTERNAL: &str = "INTERNAL";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Error returned by catalog handlers.
///
/// Rendered as `{"code": ..., "message": ...}` with the matching status:
///
/// ```json
/// {"code": "PERMISSION_DENIED", "message": "'alice' may not view video 0f3c"}
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No video, source or privilege with that id. 404.
    #[error("{0}")]
    NotFound(String),

    /// A privilege id that is already registered. 409.
    #[error("{0}")]
    Conflict(String),

    /// Bad layer, empty title, dangling reference, or a delete that would
    /// orphan videos. 400.
    #[error("{0}")]
    Validation(String),

    /// The request carried no usable identity. 401.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller's grants do not cover the video, or the action needs a
    /// sys-admin. 403.
    #[error("{0}")]
    PermissionDenied(String),

    /// The grant store or cache failed. 500.
    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use error_code::*;
        match self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, ALREADY_EXISTS),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, VALIDATION_FAILED),
            ServiceError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, UNAUTHENTICATED),
            ServiceError::PermissionDenied(_) => (StatusCode::FORBIDDEN, PERMISSION_DENIED),
            ServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, STORAGE_ERROR),
            ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.parts().1
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let body = serde_json::json!({
            "code": code,
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
