use vidcat_core::{Principal, now_rfc3339};
use vidcat_sql::Value;

use crate::model::{Video, VideoView, ViewStats};
use crate::service::{CatalogError, CatalogService};

impl CatalogService {
    /// Count one view of a video by the caller.
    pub async fn record_view(&self, principal: &Principal, video_id: &str) -> Result<VideoView, CatalogError> {
        let video = self.get_video(principal, video_id).await?;
        let now = now_rfc3339();
        self.sql.exec(
            "INSERT INTO video_views (video_id, user_id, count, last_viewed_at) VALUES (?1, ?2, 1, ?3) \
             ON CONFLICT (video_id, user_id) DO UPDATE SET count = count + 1, last_viewed_at = excluded.last_viewed_at",
            &[
                video.id.as_str().into(),
                principal.user_id.as_str().into(),
                Value::Text(now),
            ],
        )?;
        self.view_of(&video, &principal.user_id)
    }

    /// Totals for a video the caller can see.
    pub async fn view_stats(&self, principal: &Principal, video_id: &str) -> Result<ViewStats, CatalogError> {
        let video = self.get_video(principal, video_id).await?;
        let rows = self.sql.query(
            "SELECT COALESCE(SUM(count), 0) AS total, COUNT(*) AS viewers FROM video_views WHERE video_id = ?1",
            &[video.id.as_str().into()],
        )?;
        let row = rows.first();
        Ok(ViewStats {
            total_views: row.and_then(|r| r.get_i64("total")).unwrap_or(0),
            viewers: row.and_then(|r| r.get_i64("viewers")).unwrap_or(0),
            video_id: video.id,
        })
    }

    fn view_of(&self, video: &Video, user_id: &str) -> Result<VideoView, CatalogError> {
        let rows = self.sql.query(
            "SELECT count, last_viewed_at FROM video_views WHERE video_id = ?1 AND user_id = ?2",
            &[video.id.as_str().into(), user_id.into()],
        )?;
        let row = rows
            .first()
            .ok_or_else(|| CatalogError::Internal(format!("view row for {} vanished", video.id)))?;
        Ok(VideoView {
            video_id: video.id.clone(),
            user_id: user_id.to_string(),
            count: row.get_i64("count").unwrap_or(0),
            last_viewed_at: row.get_str("last_viewed_at").unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreateClassificationSource, CreateVideo};
    use crate::service::authority::AuthorityGrants;
    use crate::service::testing::{fixture, more_then_little};

    fn video(svc: &CatalogService, source: Option<String>) -> Video {
        svc.create_video(
            &Principal::sys_admin("root"),
            CreateVideo {
                title: "demo".into(),
                description: String::new(),
                classification_source: source,
                privilege: None,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_view_counts_per_user() {
        let fx = fixture(AuthorityGrants::none());
        let svc = &fx.service;
        let v = video(svc, None);

        let alice = Principal::user("alice");
        let bob = Principal::user("bob");
        svc.record_view(&alice, &v.id).await.unwrap();
        let second = svc.record_view(&alice, &v.id).await.unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(second.user_id, "alice");
        assert!(!second.last_viewed_at.is_empty());

        assert_eq!(svc.record_view(&bob, &v.id).await.unwrap().count, 1);

        let stats = svc.view_stats(&alice, &v.id).await.unwrap();
        assert_eq!(stats.total_views, 3);
        assert_eq!(stats.viewers, 2);
    }

    #[tokio::test]
    async fn test_stats_for_unviewed_video_are_zero() {
        let fx = fixture(AuthorityGrants::none());
        let v = video(&fx.service, None);
        let stats = fx.service.view_stats(&Principal::user("alice"), &v.id).await.unwrap();
        assert_eq!(stats.total_views, 0);
        assert_eq!(stats.viewers, 0);
    }

    #[tokio::test]
    async fn test_views_require_view_access() {
        let fx = fixture(more_then_little());
        let svc = &fx.service;
        let source = svc
            .create_source(
                &Principal::sys_admin("root"),
                CreateClassificationSource {
                    name: "restricted".into(),
                    classification_id: 3,
                    layer: 4,
                },
            )
            .unwrap();
        let v = video(svc, Some(source.id));

        let user = Principal::user("c@moreThenLittle");
        assert!(matches!(
            svc.record_view(&user, &v.id).await,
            Err(CatalogError::Forbidden(_))
        ));
        assert!(matches!(
            svc.view_stats(&user, &v.id).await,
            Err(CatalogError::Forbidden(_))
        ));
        assert!(matches!(
            svc.record_view(&user, "missing").await,
            Err(CatalogError::NotFound(_))
        ));
    }
}
