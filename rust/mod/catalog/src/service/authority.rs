//! Client for the remote classification authority.
//!
//! The authority answers `GET <base>/userPermissions?userName=<id>` with
//! either `null` (unknown user) or an object carrying two allow-lists. The
//! key names inside that object vary between deployments, so they are read
//! through [`FieldNames`] and renamed into a fixed shape before parsing.
//!
//! Nothing here ever fails towards the caller: an unreachable, slow, or
//! confused authority yields a user with no grants.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{ClassificationGrant, Layer, PrivilegeGrant, UserGrants};
use crate::service::CatalogError;

/// Grants as reported by the authority.
///
/// A `None` category was missing from the payload, so the stored rows for
/// that category should be left alone. Failures and unknown users report
/// both categories as present and empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityGrants {
    pub classifications: Option<Vec<ClassificationGrant>>,
    pub privileges: Option<Vec<PrivilegeGrant>>,
}

impl AuthorityGrants {
    /// Both categories present and empty.
    pub fn none() -> Self {
        Self {
            classifications: Some(Vec::new()),
            privileges: Some(Vec::new()),
        }
    }
}

impl From<UserGrants> for AuthorityGrants {
    fn from(g: UserGrants) -> Self {
        Self {
            classifications: Some(g.classifications),
            privileges: Some(g.privileges),
        }
    }
}

/// Source of truth for user grants.
#[async_trait]
pub trait GrantAuthority: Send + Sync {
    /// Fetch the user's grants. Infallible: every failure is logged and
    /// reported as [`AuthorityGrants::none`].
    async fn fetch(&self, user_id: &str) -> AuthorityGrants;
}

// ── Configuration ──

/// Key names used in the authority's payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub classifications_allow: String,
    pub classification_id: String,
    pub classification_layer: String,
    pub pp_allow: String,
    pub pp_id: String,
    pub pp_type: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            classifications_allow: "classificationsAllow".into(),
            classification_id: "classificationId".into(),
            classification_layer: "classificationLayer".into(),
            pp_allow: "ppAllow".into(),
            pp_id: "ppId".into(),
            pp_type: "ppType".into(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

/// Connection settings for [`HttpAuthority`].
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    /// Base URL; `/userPermissions` is appended.
    pub base_url: String,
    /// Sent as a bearer token when set.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fields: FieldNames,
}

impl AuthorityConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_secs: default_timeout_secs(),
            fields: FieldNames::default(),
        }
    }
}

// ── Payload mapping ──

/// Canonical shape of a permissions payload, after renaming.
#[derive(Debug, Deserialize)]
struct Permissions {
    #[serde(default)]
    classifications: Option<Vec<RawClassification>>,
    #[serde(default)]
    privileges: Option<Vec<RawPrivilege>>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    id: Option<i64>,
    layer: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawPrivilege {
    id: Option<i64>,
    #[serde(rename = "type", default)]
    pp_type: Option<String>,
}

impl FieldNames {
    /// Map a non-null payload into grants stamped with `user_id`.
    ///
    /// Records without an id, or with a layer outside 0..=4, are dropped.
    /// Repeated classification ids keep their highest layer; repeated
    /// privilege ids keep the first type seen.
    pub fn map_payload(&self, user_id: &str, payload: &Value) -> Result<AuthorityGrants, String> {
        let canonical = self.rename(payload)?;
        let parsed: Permissions =
            serde_json::from_value(canonical).map_err(|e| format!("malformed permissions: {}", e))?;

        let classifications = parsed.classifications.map(|records| {
            let mut best: BTreeMap<i64, Layer> = BTreeMap::new();
            for raw in records {
                let (Some(id), Some(layer)) = (raw.id, raw.layer.and_then(Layer::new)) else {
                    warn!(user_id, ?raw, "dropping unusable classification record");
                    continue;
                };
                let slot = best.entry(id).or_insert(layer);
                *slot = (*slot).max(layer);
            }
            best.into_iter()
                .map(|(classification_id, layer)| ClassificationGrant {
                    user_id: user_id.to_string(),
                    classification_id,
                    layer,
                })
                .collect()
        });

        let privileges = parsed.privileges.map(|records| {
            let mut seen: BTreeMap<i64, String> = BTreeMap::new();
            for raw in records {
                let Some(id) = raw.id else {
                    warn!(user_id, ?raw, "dropping privilege record without id");
                    continue;
                };
                seen.entry(id).or_insert_with(|| raw.pp_type.unwrap_or_default());
            }
            seen.into_iter()
                .map(|(privilege_id, pp_type)| PrivilegeGrant {
                    user_id: user_id.to_string(),
                    privilege_id,
                    pp_type,
                })
                .collect()
        });

        Ok(AuthorityGrants {
            classifications,
            privileges,
        })
    }

    /// Rewrite configured key names into the canonical ones.
    fn rename(&self, payload: &Value) -> Result<Value, String> {
        let obj = payload
            .as_object()
            .ok_or_else(|| "permissions payload is not an object".to_string())?;

        let mut out = Map::new();
        if let Some(list) = present(obj, &self.classifications_allow) {
            out.insert(
                "classifications".into(),
                rename_records(list, &[(&self.classification_id, "id"), (&self.classification_layer, "layer")])?,
            );
        }
        if let Some(list) = present(obj, &self.pp_allow) {
            out.insert(
                "privileges".into(),
                rename_records(list, &[(&self.pp_id, "id"), (&self.pp_type, "type")])?,
            );
        }
        Ok(Value::Object(out))
    }
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn rename_records(list: &Value, renames: &[(&String, &str)]) -> Result<Value, String> {
    let records = list
        .as_array()
        .ok_or_else(|| "allow-list is not an array".to_string())?;
    let renamed = records
        .iter()
        .map(|record| {
            let mut out = Map::new();
            for (from, to) in renames {
                if let Some(v) = record.get(from.as_str()) {
                    out.insert((*to).to_string(), numeric_string_to_number(v));
                }
            }
            Value::Object(out)
        })
        .collect();
    Ok(Value::Array(renamed))
}

/// Some deployments send ids as strings. Leave anything else untouched.
fn numeric_string_to_number(v: &Value) -> Value {
    match v.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) => Value::from(n),
        None => v.clone(),
    }
}

// ── HTTP client ──

#[derive(Debug, Error)]
enum AuthorityError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authority returned HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Payload(String),
}

/// [`GrantAuthority`] over HTTP, with a bounded per-request timeout.
pub struct HttpAuthority {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    fields: FieldNames,
}

impl HttpAuthority {
    pub fn new(config: AuthorityConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::Internal(format!("authority client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: format!("{}/userPermissions", config.base_url.trim_end_matches('/')),
            token: config.token.filter(|t| !t.is_empty()),
            fields: config.fields,
        })
    }

    async fn try_fetch(&self, user_id: &str) -> Result<Option<AuthorityGrants>, AuthorityError> {
        let mut req = self.http.get(&self.endpoint).query(&[("userName", user_id)]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(AuthorityError::Status(resp.status().as_u16()));
        }

        let payload: Value = resp.json().await?;
        if payload.is_null() {
            return Ok(None);
        }
        self.fields
            .map_payload(user_id, &payload)
            .map(Some)
            .map_err(AuthorityError::Payload)
    }
}

#[async_trait]
impl GrantAuthority for HttpAuthority {
    async fn fetch(&self, user_id: &str) -> AuthorityGrants {
        match self.try_fetch(user_id).await {
            Ok(Some(grants)) => grants,
            Ok(None) => {
                debug!(user_id, "user unknown to classification authority");
                AuthorityGrants::none()
            }
            Err(e) => {
                warn!(user_id, error = %e, "classification authority unavailable, using no grants");
                AuthorityGrants::none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    use crate::service::testing::{class_grant, pp_grant};

    /// Serve `router` on an ephemeral port, returning its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> HttpAuthority {
        HttpAuthority::new(AuthorityConfig {
            timeout_secs: 1,
            ..AuthorityConfig::new(base_url)
        })
        .unwrap()
    }

    #[test]
    fn test_map_payload_default_fields() {
        let payload = json!({
            "classificationsAllow": [
                {"classificationId": 3, "classificationLayer": 2},
                {"classificationId": 7, "classificationLayer": 4},
            ],
            "ppAllow": [
                {"ppId": 5, "ppType": "project"},
                {"ppId": "66", "ppType": "project"},
            ],
        });
        let grants = FieldNames::default().map_payload("u", &payload).unwrap();
        assert_eq!(
            grants.classifications.unwrap(),
            vec![class_grant("u", 3, 2), class_grant("u", 7, 4)]
        );
        assert_eq!(grants.privileges.unwrap(), vec![pp_grant("u", 5), pp_grant("u", 66)]);
    }

    #[test]
    fn test_map_payload_custom_fields() {
        let fields = FieldNames {
            classifications_allow: "cls".into(),
            classification_id: "cid".into(),
            classification_layer: "lvl".into(),
            pp_allow: "pps".into(),
            pp_id: "pid".into(),
            pp_type: "kind".into(),
        };
        let payload = json!({
            "cls": [{"cid": 1, "lvl": 0}],
            "pps": [{"pid": 9, "kind": "team"}],
        });
        let grants = fields.map_payload("u", &payload).unwrap();
        assert_eq!(grants.classifications.unwrap(), vec![class_grant("u", 1, 0)]);
        let pps = grants.privileges.unwrap();
        assert_eq!(pps[0].privilege_id, 9);
        assert_eq!(pps[0].pp_type, "team");
    }

    #[test]
    fn test_map_payload_drops_bad_records_and_keeps_highest_layer() {
        let payload = json!({
            "classificationsAllow": [
                {"classificationId": 1, "classificationLayer": 7},
                {"classificationLayer": 2},
                {"classificationId": 2, "classificationLayer": 1},
                {"classificationId": 2, "classificationLayer": 3},
            ],
            "ppAllow": [{"ppType": "orphan"}],
        });
        let grants = FieldNames::default().map_payload("u", &payload).unwrap();
        assert_eq!(grants.classifications.unwrap(), vec![class_grant("u", 2, 3)]);
        assert_eq!(grants.privileges.unwrap(), vec![]);
    }

    #[test]
    fn test_map_payload_missing_category_is_none() {
        let payload = json!({"ppAllow": []});
        let grants = FieldNames::default().map_payload("u", &payload).unwrap();
        assert_eq!(grants.classifications, None);
        assert_eq!(grants.privileges, Some(vec![]));
    }

    #[test]
    fn test_map_payload_rejects_non_object() {
        assert!(FieldNames::default().map_payload("u", &json!([1, 2])).is_err());
        assert!(FieldNames::default()
            .map_payload("u", &json!({"classificationsAllow": 5}))
            .is_err());
    }

    #[tokio::test]
    async fn test_fetch_sends_user_and_token() {
        let router = Router::new().route(
            "/userPermissions",
            get(|Query(q): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer s3cret");
                if q.get("userName").map(String::as_str) != Some("c@moreThenLittle") || !authorized {
                    return Json(Value::Null);
                }
                Json(json!({
                    "classificationsAllow": [{"classificationId": 7, "classificationLayer": 4}],
                    "ppAllow": [{"ppId": 5, "ppType": "project"}],
                }))
            }),
        );
        let base = serve(router).await;
        let authority = HttpAuthority::new(AuthorityConfig {
            token: Some("s3cret".into()),
            ..AuthorityConfig::new(format!("{}/", base))
        })
        .unwrap();

        let grants = authority.fetch("c@moreThenLittle").await;
        assert_eq!(
            grants.classifications.unwrap(),
            vec![class_grant("c@moreThenLittle", 7, 4)]
        );
        assert_eq!(grants.privileges.unwrap(), vec![pp_grant("c@moreThenLittle", 5)]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_user_is_empty() {
        let router = Router::new().route("/userPermissions", get(|| async { Json(Value::Null) }));
        let authority = client(serve(router).await);
        assert_eq!(authority.fetch("unknown@user").await, AuthorityGrants::none());
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_empty() {
        let router = Router::new().route(
            "/userPermissions",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let authority = client(serve(router).await);
        assert_eq!(authority.fetch("alice").await, AuthorityGrants::none());
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_empty() {
        let router = Router::new().route(
            "/userPermissions",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"classificationsAllow": [{"classificationId": 1, "classificationLayer": 4}]}))
            }),
        );
        let authority = client(serve(router).await);
        assert_eq!(authority.fetch("alice").await, AuthorityGrants::none());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_empty() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let authority = client(format!("http://{}", addr));
        assert_eq!(authority.fetch("alice").await, AuthorityGrants::none());
    }
}
