use serde::{Deserialize, Serialize};

use super::requirement::PrivilegeRequirement;

/// Video metadata. The file itself lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Id of the [`ClassificationSource`](super::ClassificationSource) gating this video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_source: Option<String>,
    /// Privilege point a viewer must hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privilege: Option<i64>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Video {
    pub fn privilege_requirement(&self) -> Option<PrivilegeRequirement> {
        self.privilege.map(|privilege_id| PrivilegeRequirement { privilege_id })
    }
}

/// Input for creating a video.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub classification_source: Option<String>,
    #[serde(default)]
    pub privilege: Option<i64>,
}
