use serde::{Deserialize, Serialize};

use super::grant::Layer;
use super::requirement::ClassificationRequirement;

/// A catalog entry that videos reference to declare their sensitivity.
///
/// Several sources may share a classification id at different layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSource {
    pub id: String,
    pub name: String,
    pub classification_id: i64,
    pub layer: Layer,
    pub created_at: String,
    pub updated_at: String,
}

impl ClassificationSource {
    pub fn requirement(&self) -> ClassificationRequirement {
        ClassificationRequirement {
            classification_id: self.classification_id,
            layer: self.layer,
        }
    }
}

/// Input for creating a classification source.
///
/// `layer` is taken as a plain integer so an out-of-range value is reported
/// as a validation failure instead of a body decode error.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClassificationSource {
    pub name: String,
    pub classification_id: i64,
    pub layer: i64,
}

/// Search parameters for `GET /classifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub classification_id: Option<i64>,
}
