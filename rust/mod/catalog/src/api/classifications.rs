use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use vidcat_core::{ListParams, ListResult, Principal, ServiceError};

use crate::api::AppState;
use crate::model::{ClassificationSource, CreateClassificationSource, SourceQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/classifications", get(search_sources).post(create_source))
        .route("/classifications/{id}", get(get_source).delete(delete_source))
}

async fn search_sources(
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<ClassificationSource>>, ServiceError> {
    Ok(Json(state.service.search_sources(&query, &params)?))
}

async fn create_source(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CreateClassificationSource>,
) -> Result<(StatusCode, Json<ClassificationSource>), ServiceError> {
    let source = state.service.create_source(&principal, input)?;
    Ok((StatusCode::CREATED, Json(source)))
}

async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassificationSource>, ServiceError> {
    Ok(Json(state.service.get_source(&id)?))
}

async fn delete_source(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.service.delete_source(&principal, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
