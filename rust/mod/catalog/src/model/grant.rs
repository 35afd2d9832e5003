use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification sensitivity tier, 0 through 4. Higher is more permissive
/// when held as a grant and more restrictive when demanded by a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Layer(u8);

impl Layer {
    pub const MIN: Layer = Layer(0);
    pub const MAX: Layer = Layer(4);

    /// Returns `None` when `value` is outside `0..=4`.
    pub fn new(value: i64) -> Option<Self> {
        if (0..=Self::MAX.0 as i64).contains(&value) {
            Some(Layer(value as u8))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// A grant at this layer covers any requirement at or below it.
    pub fn covers(self, required: Layer) -> bool {
        self >= required
    }
}

impl TryFrom<i64> for Layer {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Layer::new(value).ok_or_else(|| format!("classification layer {} is outside 0..=4", value))
    }
}

impl From<Layer> for i64 {
    fn from(layer: Layer) -> Self {
        layer.0 as i64
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The highest layer a user may view for one classification id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationGrant {
    pub user_id: String,
    pub classification_id: i64,
    pub layer: Layer,
}

/// Possession of a privilege point (pp). The type is descriptive only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeGrant {
    pub user_id: String,
    pub privilege_id: i64,
    #[serde(rename = "type")]
    pub pp_type: String,
}

/// Everything a user currently holds. Both lists may be empty, which means
/// the user can only see public videos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrants {
    pub classifications: Vec<ClassificationGrant>,
    pub privileges: Vec<PrivilegeGrant>,
}

impl UserGrants {
    pub fn is_empty(&self) -> bool {
        self.classifications.is_empty() && self.privileges.is_empty()
    }
}
