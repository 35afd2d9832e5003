use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::api::AppState;

/// Identify the caller and store the [`Principal`](vidcat_core::Principal)
/// as a request extension for handlers to extract.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match state.authenticator.authenticate(req.headers()) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            debug!(path = %req.uri().path(), error = %e, "rejected unauthenticated request");
            e.into_response()
        }
    }
}
