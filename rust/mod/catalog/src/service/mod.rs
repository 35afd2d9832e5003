pub mod authority;
pub mod authorizer;
pub mod cache;
pub mod grants;
pub mod privilege;
pub mod resolver;
pub mod schema;
pub mod source;
pub mod video;
pub mod view;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use vidcat_core::Principal;
use vidcat_sql::{SQLError, SQLStore, Value};

use crate::model::UserGrants;
use crate::service::resolver::ClassificationResolver;

/// Catalog service error type.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<SQLError> for CatalogError {
    fn from(e: SQLError) -> Self {
        match e {
            SQLError::Constraint(m) => CatalogError::Conflict(m),
            other => CatalogError::Storage(other.to_string()),
        }
    }
}

impl From<vidcat_kv::KVError> for CatalogError {
    fn from(e: vidcat_kv::KVError) -> Self {
        CatalogError::Storage(e.to_string())
    }
}

impl From<CatalogError> for vidcat_core::ServiceError {
    fn from(e: CatalogError) -> Self {
        use vidcat_core::ServiceError;
        match e {
            CatalogError::NotFound(m) => ServiceError::NotFound(m),
            CatalogError::Conflict(m) => ServiceError::Conflict(m),
            CatalogError::Validation(m) => ServiceError::Validation(m),
            CatalogError::Forbidden(m) => ServiceError::PermissionDenied(m),
            CatalogError::Storage(m) => ServiceError::Storage(m),
            CatalogError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

/// A WHERE-clause condition for [`CatalogService::list_records`].
pub(crate) enum Filter {
    /// `column = value`
    Eq(&'static str, Value),
    /// Case-insensitive substring match on any of the columns.
    Contains(&'static [&'static str], String),
}

/// The video catalog: videos, views, classification sources and privilege
/// points, with every read gated by the caller's resolved grants.
pub struct CatalogService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) resolver: Arc<ClassificationResolver>,
}

impl CatalogService {
    /// Create a new CatalogService, initializing the catalog tables.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        resolver: Arc<ClassificationResolver>,
    ) -> Result<Arc<Self>, CatalogError> {
        schema::init_catalog_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql, resolver }))
    }

    /// The caller's current grants. Sys-admins skip resolution entirely,
    /// since no check will look at their grants.
    pub async fn grants_for(&self, principal: &Principal) -> Result<UserGrants, CatalogError> {
        if principal.sys_admin {
            return Ok(UserGrants::default());
        }
        self.resolver.resolve(&principal.user_id).await
    }

    /// The caller's grants, always resolved. Backs `GET /me/grants`.
    pub async fn my_grants(&self, principal: &Principal) -> Result<UserGrants, CatalogError> {
        self.resolver.resolve(&principal.user_id).await
    }

    pub(crate) fn require_sys_admin(
        &self,
        principal: &Principal,
        action: &str,
    ) -> Result<(), CatalogError> {
        if principal.sys_admin {
            Ok(())
        } else {
            Err(CatalogError::Forbidden(format!(
                "'{}' may not {}",
                principal.user_id, action
            )))
        }
    }

    // ── Generic record helpers ──

    /// Insert a record as JSON into a table with indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: Value,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), CatalogError> {
        let json =
            serde_json::to_string(record).map_err(|e| CatalogError::Internal(e.to_string()))?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![id, Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            cols.push(col);
            placeholders.push(format!("?{}", i + 3));
            params.push(val.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );
        self.sql.exec(&sql, &params)?;
        Ok(())
    }

    /// Get a record by id. `Ok(None)` when absent.
    pub(crate) fn find_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: Value,
    ) -> Result<Option<T>, CatalogError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
        let rows = self.sql.query(&sql, &[id])?;
        match rows.first() {
            Some(row) => decode_data(row).map(Some),
            None => Ok(None),
        }
    }

    /// Get a record by id, failing with NotFound.
    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: Value,
    ) -> Result<T, CatalogError> {
        let label = display_id(&id);
        self.find_record(table, id)?
            .ok_or_else(|| CatalogError::NotFound(format!("{}/{}", table, label)))
    }

    /// Update a record's JSON data and indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: Value,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), CatalogError> {
        let json =
            serde_json::to_string(record).map_err(|e| CatalogError::Internal(e.to_string()))?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            sets.push(format!("{} = ?{}", col, i + 2));
            params.push(val.clone());
        }

        let label = display_id(&id);
        let id_idx = params.len() + 1;
        params.push(id);

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            id_idx,
        );
        if self.sql.exec(&sql, &params)? == 0 {
            return Err(CatalogError::NotFound(format!("{}/{}", table, label)));
        }
        Ok(())
    }

    /// Delete a record by id.
    pub(crate) fn delete_record(&self, table: &str, id: Value) -> Result<(), CatalogError> {
        let label = display_id(&id);
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        if self.sql.exec(&sql, &[id])? == 0 {
            return Err(CatalogError::NotFound(format!("{}/{}", table, label)));
        }
        Ok(())
    }

    /// List records matching all filters, newest first, with pagination.
    pub(crate) fn list_records<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<T>, usize), CatalogError> {
        let (where_sql, mut params) = build_where(filters);

        let count_sql = format!("SELECT COUNT(*) AS cnt FROM {}{}", table, where_sql);
        let total = self
            .sql
            .query(&count_sql, &params)?
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let sql = format!(
            "SELECT data FROM {}{} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            table, where_sql, limit_idx, offset_idx,
        );
        let rows = self.sql.query(&sql, &params)?;
        let items = rows.iter().map(decode_data).collect::<Result<Vec<T>, _>>()?;
        Ok((items, total))
    }

    /// Number of rows in `table` where `column = value`.
    pub(crate) fn count_where(
        &self,
        table: &str,
        column: &str,
        value: Value,
    ) -> Result<i64, CatalogError> {
        let sql = format!("SELECT COUNT(*) AS cnt FROM {} WHERE {} = ?1", table, column);
        Ok(self
            .sql
            .query(&sql, &[value])?
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0))
    }
}

fn build_where(filters: &[Filter]) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for filter in filters {
        let idx = params.len() + 1;
        match filter {
            Filter::Eq(col, val) => {
                clauses.push(format!("{} = ?{}", col, idx));
                params.push(val.clone());
            }
            Filter::Contains(cols, needle) => {
                let any: Vec<String> = cols
                    .iter()
                    .map(|c| format!("LOWER({}) LIKE ?{} ESCAPE '\\'", c, idx))
                    .collect();
                clauses.push(format!("({})", any.join(" OR ")));
                params.push(Value::Text(like_pattern(needle)));
            }
        }
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, params)
}

/// `%needle%` for a `LIKE ... ESCAPE '\'` clause. Wildcards in the needle
/// match literally.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn decode_data<T: DeserializeOwned>(row: &vidcat_sql::Row) -> Result<T, CatalogError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| CatalogError::Internal("missing data column".into()))?;
    serde_json::from_str(data).map_err(|e| CatalogError::Internal(e.to_string()))
}

fn display_id(id: &Value) -> String {
    match id {
        Value::Text(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        other => format!("{:?}", other),
    }
}
