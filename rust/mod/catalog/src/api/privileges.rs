use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use vidcat_core::{ListParams, ListResult, Principal, ServiceError};

use crate::api::AppState;
use crate::model::{CreatePrivilege, Privilege};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/privileges", get(search_privileges).post(create_privilege))
        .route("/privileges/{id}", get(get_privilege).delete(delete_privilege))
}

async fn search_privileges(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Privilege>>, ServiceError> {
    Ok(Json(state.service.search_privileges(&params)?))
}

async fn create_privilege(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CreatePrivilege>,
) -> Result<(StatusCode, Json<Privilege>), ServiceError> {
    let privilege = state.service.create_privilege(&principal, input)?;
    Ok((StatusCode::CREATED, Json(privilege)))
}

async fn get_privilege(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Privilege>, ServiceError> {
    Ok(Json(state.service.get_privilege(id)?))
}

async fn delete_privilege(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.service.delete_privilege(&principal, id)?;
    Ok(StatusCode::NO_CONTENT)
}
