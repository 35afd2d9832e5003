use serde::{Deserialize, Serialize};

/// A privilege point (pp) known to the catalog. Videos may require one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Privilege {
    /// Same id space as the authority's pp grants.
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub pp_type: String,
    pub created_at: String,
}

/// Input for registering a privilege point.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrivilege {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub pp_type: String,
}
