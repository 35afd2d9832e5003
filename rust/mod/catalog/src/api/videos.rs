use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use vidcat_core::{ListParams, ListResult, Principal, ServiceError};

use crate::api::AppState;
use crate::model::{CreateVideo, Video};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/videos", get(list_videos).post(create_video))
        .route(
            "/videos/{id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
}

/// GET /catalog/videos: videos the caller may see.
async fn list_videos(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Video>>, ServiceError> {
    let result = state.service.list_videos(&principal, &params).await?;
    Ok(Json(result))
}

async fn create_video(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CreateVideo>,
) -> Result<(StatusCode, Json<Video>), ServiceError> {
    let video = state.service.create_video(&principal, input)?;
    Ok((StatusCode::CREATED, Json(video)))
}

async fn get_video(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Video>, ServiceError> {
    Ok(Json(state.service.get_video(&principal, &id).await?))
}

async fn update_video(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Video>, ServiceError> {
    Ok(Json(state.service.update_video(&principal, &id, patch).await?))
}

async fn delete_video(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.service.delete_video(&principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    use crate::api::build_router;
    use crate::api::test_util::{ADMIN, TrustedHeaders, call};
    use crate::service::testing::{fixture, more_then_little};

    const USER: &str = "c@moreThenLittle";

    #[tokio::test]
    async fn test_video_routes_enforce_classification() {
        let fx = fixture(more_then_little());
        let app = build_router(fx.service.clone(), Arc::new(TrustedHeaders));

        let (status, src) = call(
            &app,
            "POST",
            "/classifications",
            Some(ADMIN),
            Some(json!({"name": "finance", "classification_id": 3, "layer": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, secret) = call(
            &app,
            "POST",
            "/videos",
            Some(ADMIN),
            Some(json!({"title": "Budget", "classification_source": src["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, public) = call(&app, "POST", "/videos", Some(ADMIN), Some(json!({"title": "Town hall"}))).await;

        let secret_uri = format!("/videos/{}", secret["id"].as_str().unwrap());
        let (status, body) = call(&app, "GET", &secret_uri, Some(USER), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");

        let (status, _) = call(&app, "GET", &secret_uri, Some(ADMIN), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "GET", "/videos/missing", Some(USER), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, body) = call(&app, "GET", "/videos", Some(USER), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["id"], public["id"]);
    }

    #[tokio::test]
    async fn test_video_crud_routes() {
        let fx = fixture(more_then_little());
        let app = build_router(fx.service.clone(), Arc::new(TrustedHeaders));

        let (status, body) = call(
            &app,
            "POST",
            "/videos",
            Some(USER),
            Some(json!({"title": "x", "privilege": 404})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");

        let (status, video) = call(&app, "POST", "/videos", Some(USER), Some(json!({"title": "Demo"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(video["created_by"], USER);
        let uri = format!("/videos/{}", video["id"].as_str().unwrap());

        let (status, patched) = call(&app, "PATCH", &uri, Some(USER), Some(json!({"description": "notes"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["description"], "notes");

        let (status, body) = call(&app, "PATCH", &uri, Some(USER), Some(json!({"privilege": 66}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");

        let (status, _) = call(&app, "DELETE", &uri, Some(USER), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &uri, Some(USER), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let fx = fixture(more_then_little());
        let app = build_router(fx.service.clone(), Arc::new(TrustedHeaders));
        let (status, body) = call(&app, "GET", "/videos", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert_eq!(fx.authority.calls(), 0);
    }
}
