use serde::{Deserialize, Serialize};

/// Parameters for list/search operations.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    /// Maximum number of results to return.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Number of matching results to skip.
    #[serde(default)]
    pub offset: usize,

    /// Case-insensitive substring filter on the resource's display name.
    #[serde(default)]
    pub q: Option<String>,
}

fn default_limit() -> usize {
    50
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
            q: None,
        }
    }
}

impl ListParams {
    /// Cut an already-filtered result set down to the requested window.
    ///
    /// Used where filtering happens in application code, after the rows
    /// have left the store.
    pub fn window<T: Serialize>(&self, items: Vec<T>) -> ListResult<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        ListResult { items, total }
    }

    /// The `q` filter, trimmed and lowercased. `None` when blank.
    pub fn query(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

/// Result wrapper for list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Merge a JSON patch into a base value.
///
/// For each key in `patch`:
/// - If the value is `null`, the key is removed from `base`.
/// - Otherwise, the key is set to the patch value.
///
/// This follows RFC 7386 (JSON Merge Patch) semantics.
pub fn merge_patch(base: &mut serde_json::Value, patch: &serde_json::Value) {
    if let (Some(base_obj), Some(patch_obj)) = (base.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_obj {
            if value.is_null() {
                base_obj.remove(key);
            } else if value.is_object() {
                let entry = base_obj
                    .entry(key.clone())
                    .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                merge_patch(entry, value);
            } else {
                base_obj.insert(key.clone(), value.clone());
            }
        }
    } else {
        *base = patch.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
    }

    #[test]
    fn test_window() {
        let params = ListParams {
            limit: 2,
            offset: 1,
            q: None,
        };
        let result = params.window(vec![1, 2, 3, 4]);
        assert_eq!(result.items, vec![2, 3]);
        assert_eq!(result.total, 4);
    }

    #[test]
    fn test_query_normalized() {
        let mut params = ListParams::default();
        assert_eq!(params.query(), None);
        params.q = Some("   ".into());
        assert_eq!(params.query(), None);
        params.q = Some(" Drone ".into());
        assert_eq!(params.query().as_deref(), Some("drone"));
    }

    #[test]
    fn test_merge_patch_removes_null_keys() {
        let mut base = serde_json::json!({"title": "a", "privilege": 5});
        let patch = serde_json::json!({"privilege": null, "title": "b"});
        merge_patch(&mut base, &patch);
        assert_eq!(base, serde_json::json!({"title": "b"}));
    }
}
