use serde::{Deserialize, Serialize};

use super::grant::Layer;

/// Minimum classification a viewer must hold, taken from the video's
/// classification source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequirement {
    pub classification_id: i64,
    pub layer: Layer,
}

/// Privilege point a viewer must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeRequirement {
    pub privilege_id: i64,
}

/// Outcome of joining a video to its classification source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationGate {
    /// The video names no classification source.
    Unclassified,
    /// The video's source was found.
    Required(ClassificationRequirement),
    /// The video names a source that no longer exists. Nobody but a
    /// sys-admin can satisfy it.
    Unresolved,
}

/// What a video demands of a viewer, after the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoAccess {
    pub classification: ClassificationGate,
    pub privilege: Option<PrivilegeRequirement>,
}

impl VideoAccess {
    pub const PUBLIC: VideoAccess = VideoAccess {
        classification: ClassificationGate::Unclassified,
        privilege: None,
    };

    pub fn new(
        classification: ClassificationGate,
        privilege: Option<PrivilegeRequirement>,
    ) -> Self {
        Self {
            classification,
            privilege,
        }
    }

    /// No classification and no privilege requirement.
    pub fn is_public(&self) -> bool {
        matches!(self.classification, ClassificationGate::Unclassified) && self.privilege.is_none()
    }
}
