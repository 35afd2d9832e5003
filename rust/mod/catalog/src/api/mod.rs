mod classifications;
mod me;
mod middleware;
mod privileges;
mod videos;
mod views;

use std::sync::Arc;

use axum::Router;

use vidcat_core::Authenticator;

use crate::service::CatalogService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CatalogService>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// Build the catalog API router.
///
/// Routes are relative; the server nests them under `/catalog`. Every route
/// requires an authenticated caller.
pub fn build_router(service: Arc<CatalogService>, authenticator: Arc<dyn Authenticator>) -> Router {
    let state = AppState {
        service,
        authenticator,
    };

    Router::new()
        .merge(videos::routes())
        .merge(views::routes())
        .merge(classifications::routes())
        .merge(privileges::routes())
        .merge(me::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .with_state(state)
}
