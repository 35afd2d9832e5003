//! Route registration: system endpoints plus every module's routes.

use axum::Router;
use axum::response::IntoResponse;
use axum::routing::get;

/// Build the complete router.
///
/// `/health` and `/version` are public; modules authenticate their own
/// routes and are mounted under `/{name}`.
pub fn build_router(module_routes: Vec<(&str, Router)>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for (name, router) in module_routes {
        app = app.nest(&format!("/{}", name), router);
    }
    app
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "videod",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
