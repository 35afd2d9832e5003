use tracing::debug;

use vidcat_core::{ListParams, ListResult, Principal, merge_patch, new_id, now_rfc3339};
use vidcat_sql::{Row, Statement, Value};

use crate::model::{
    ClassificationGate, ClassificationRequirement, CreateVideo, Layer, Video, VideoAccess,
};
use crate::service::authorizer::{build_visibility_filter, can_view};
use crate::service::{CatalogError, CatalogService, decode_data, like_pattern};

const TABLE: &str = "videos";

impl CatalogService {
    /// Create a video. Referenced source and privilege must exist.
    pub fn create_video(&self, principal: &Principal, input: CreateVideo) -> Result<Video, CatalogError> {
        let now = now_rfc3339();
        let video = Video {
            id: new_id(),
            title: input.title.trim().to_string(),
            description: input.description,
            classification_source: input.classification_source,
            privilege: input.privilege,
            created_by: principal.user_id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.validate_video(&video)?;

        self.insert_record(
            TABLE,
            Value::from(video.id.as_str()),
            &video,
            &[
                ("title", Value::from(video.title.as_str())),
                ("classification_source", Value::from(video.classification_source.clone())),
                ("privilege_id", Value::from(video.privilege)),
                ("created_by", Value::from(video.created_by.as_str())),
                ("created_at", Value::from(video.created_at.as_str())),
                ("updated_at", Value::from(video.updated_at.as_str())),
            ],
        )?;
        debug!(video_id = %video.id, "video created");
        Ok(video)
    }

    /// Get a video the caller is allowed to see.
    ///
    /// Absent videos are `NotFound`; present but denied ones are `Forbidden`.
    pub async fn get_video(&self, principal: &Principal, id: &str) -> Result<Video, CatalogError> {
        let video: Video = self.get_record(TABLE, id.into())?;
        self.authorize_video(principal, &video).await?;
        Ok(video)
    }

    /// Videos visible to the caller, newest first. `q` filters on title.
    ///
    /// The database applies the coarse filter and the source join; the
    /// per-row decision happens here, so the window is cut afterwards.
    pub async fn list_videos(
        &self,
        principal: &Principal,
        params: &ListParams,
    ) -> Result<ListResult<Video>, CatalogError> {
        let grants = self.grants_for(principal).await?;
        let filter = build_visibility_filter(&grants, principal.sys_admin);

        let mut clauses = Vec::new();
        let mut sql_params = Vec::new();
        if let Some(pre) = filter.pre_filter().where_clause() {
            clauses.push(pre.to_string());
        }
        if let Some(q) = params.query() {
            sql_params.push(Value::Text(like_pattern(&q)));
            clauses.push(format!("LOWER(v.title) LIKE ?{} ESCAPE '\\'", sql_params.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT v.data AS data, s.id AS source_id, s.classification_id AS source_cid, s.layer AS source_layer \
             FROM videos v LEFT JOIN classification_sources s ON s.id = v.classification_source{} \
             ORDER BY v.created_at DESC, v.id",
            where_sql
        );
        let rows = self.sql.query(&sql, &sql_params)?;

        let mut visible = Vec::new();
        for row in &rows {
            let video: Video = decode_data(row)?;
            let access = VideoAccess::new(gate_from_join(&video, row), video.privilege_requirement());
            if filter.matches(&access) {
                visible.push(video);
            }
        }
        debug!(
            user_id = %principal.user_id,
            scanned = rows.len(),
            visible = visible.len(),
            "listed videos"
        );
        Ok(params.window(visible))
    }

    /// Apply a JSON merge patch. The caller must be able to see the video,
    /// and the patched references must exist. Only sys-admins may change
    /// `classification_source` or `privilege`.
    pub async fn update_video(
        &self,
        principal: &Principal,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Video, CatalogError> {
        let current = self.get_video(principal, id).await?;
        let now = now_rfc3339();

        let mut base =
            serde_json::to_value(&current).map_err(|e| CatalogError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["id"] = serde_json::json!(current.id);
        base["created_by"] = serde_json::json!(current.created_by);
        base["created_at"] = serde_json::json!(current.created_at);
        base["updated_at"] = serde_json::json!(now);

        let mut updated: Video = serde_json::from_value(base)
            .map_err(|e| CatalogError::Validation(format!("invalid video patch: {}", e)))?;
        updated.title = updated.title.trim().to_string();
        if updated.classification_source != current.classification_source
            || updated.privilege != current.privilege
        {
            self.require_sys_admin(principal, "change the access requirements of a video")?;
        }
        self.validate_video(&updated)?;

        self.update_record(
            TABLE,
            id.into(),
            &updated,
            &[
                ("title", Value::from(updated.title.as_str())),
                ("classification_source", Value::from(updated.classification_source.clone())),
                ("privilege_id", Value::from(updated.privilege)),
                ("updated_at", Value::Text(now)),
            ],
        )?;
        Ok(updated)
    }

    /// Delete a video and its view counters. The caller must be able to see it.
    pub async fn delete_video(&self, principal: &Principal, id: &str) -> Result<(), CatalogError> {
        let video = self.get_video(principal, id).await?;
        self.sql.exec_batch(&[
            Statement::new("DELETE FROM video_views WHERE video_id = ?1", vec![video.id.as_str().into()]),
            Statement::new("DELETE FROM videos WHERE id = ?1", vec![video.id.as_str().into()]),
        ])?;
        debug!(video_id = %video.id, "video deleted");
        Ok(())
    }

    /// What `video` demands of a viewer, looking up its source.
    pub fn video_access(&self, video: &Video) -> Result<VideoAccess, CatalogError> {
        let gate = match &video.classification_source {
            None => ClassificationGate::Unclassified,
            Some(source_id) => match self.find_source(source_id)? {
                Some(source) => ClassificationGate::Required(source.requirement()),
                None => ClassificationGate::Unresolved,
            },
        };
        Ok(VideoAccess::new(gate, video.privilege_requirement()))
    }

    /// Deny with `Forbidden` unless the caller may view `video`.
    pub(crate) async fn authorize_video(
        &self,
        principal: &Principal,
        video: &Video,
    ) -> Result<(), CatalogError> {
        if principal.sys_admin {
            return Ok(());
        }
        let access = self.video_access(video)?;
        let grants = self.grants_for(principal).await?;
        if can_view(&access, &grants, principal.sys_admin) {
            Ok(())
        } else {
            Err(CatalogError::Forbidden(format!(
                "'{}' may not view video {}",
                principal.user_id, video.id
            )))
        }
    }

    fn validate_video(&self, video: &Video) -> Result<(), CatalogError> {
        if video.title.is_empty() {
            return Err(CatalogError::Validation("video title cannot be empty".into()));
        }
        if let Some(source_id) = &video.classification_source {
            if self.find_source(source_id)?.is_none() {
                return Err(CatalogError::Validation(format!(
                    "classification source {} does not exist",
                    source_id
                )));
            }
        }
        if let Some(privilege_id) = video.privilege {
            if self.find_privilege(privilege_id)?.is_none() {
                return Err(CatalogError::Validation(format!(
                    "privilege {} does not exist",
                    privilege_id
                )));
            }
        }
        Ok(())
    }
}

/// Classification gate from a `videos LEFT JOIN classification_sources` row.
fn gate_from_join(video: &Video, row: &Row) -> ClassificationGate {
    if video.classification_source.is_none() {
        return ClassificationGate::Unclassified;
    }
    let joined = row.get_str("source_id").is_some();
    let cid = row.get_i64("source_cid");
    let layer = row.get_i64("source_layer").and_then(Layer::new);
    match (joined, cid, layer) {
        (true, Some(classification_id), Some(layer)) => {
            ClassificationGate::Required(ClassificationRequirement {
                classification_id,
                layer,
            })
        }
        _ => ClassificationGate::Unresolved,
    }
}
