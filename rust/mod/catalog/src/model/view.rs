use serde::{Deserialize, Serialize};

/// One user's view counter for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoView {
    pub video_id: String,
    pub user_id: String,
    pub count: i64,
    pub last_viewed_at: String,
}

/// Aggregate view numbers for a video.
#[derive(Debug, Clone, Serialize)]
pub struct ViewStats {
    pub video_id: String,
    pub total_views: i64,
    pub viewers: i64,
}
