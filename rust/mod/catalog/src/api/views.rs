use axum::extract::{Extension, Path, State};
use axum::routing::post;
use axum::{Json, Router};

use vidcat_core::{Principal, ServiceError};

use crate::api::AppState;
use crate::model::{VideoView, ViewStats};

pub fn routes() -> Router<AppState> {
    Router::new().route("/videos/{id}/views", post(record_view).get(view_stats))
}

/// POST /catalog/videos/{id}/views: count one view by the caller.
async fn record_view(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<VideoView>, ServiceError> {
    Ok(Json(state.service.record_view(&principal, &id).await?))
}

async fn view_stats(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ViewStats>, ServiceError> {
    Ok(Json(state.service.view_stats(&principal, &id).await?))
}
