use axum::extract::{Extension, State};
use axum::routing::get;
use axum::{Json, Router};

use vidcat_core::{Principal, ServiceError};

use crate::api::AppState;
use crate::model::UserGrants;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me/grants", get(my_grants))
}

/// GET /catalog/me/grants: the caller's resolved classifications and pps.
async fn my_grants(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UserGrants>, ServiceError> {
    Ok(Json(state.service.my_grants(&principal).await?))
}
