use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Statement, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path).map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL keeps readers unblocked while a grant refresh commits.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        debug!("opened sqlite store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
            }
        })
        .collect()
}

/// Classify an execution failure, separating constraint violations so
/// callers can report duplicates as conflicts.
fn exec_error(e: rusqlite::Error) -> SQLError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => SQLError::Constraint(e.to_string()),
        _ => SQLError::Execution(e.to_string()),
    }
}

fn execute_one(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
    let affected = conn.execute(sql, param_refs.as_slice()).map_err(exec_error)?;
    Ok(affected as u64)
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), row_value_at(row, i)?));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
        }
        Ok(result)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        execute_one(&conn, sql, params)
    }

    fn exec_batch(&self, statements: &[Statement]) -> Result<u64, SQLError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;
        let mut total = 0;
        for stmt in statements {
            // Dropping `tx` on the error path rolls the batch back.
            total += execute_one(&tx, &stmt.sql, &stmt.params)?;
        }
        tx.commit()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;
        Ok(total)
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Value> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec(
                "CREATE TABLE grants (user_id TEXT NOT NULL, gid INTEGER NOT NULL, PRIMARY KEY (user_id, gid))",
                &[],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_query_roundtrip() {
        let store = store();
        store
            .exec("INSERT INTO grants VALUES (?1, ?2)", &["alice".into(), 3i64.into()])
            .unwrap();
        let rows = store
            .query("SELECT user_id, gid FROM grants WHERE user_id = ?1", &["alice".into()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("user_id"), Some("alice"));
        assert_eq!(rows[0].get_i64("gid"), Some(3));
    }

    #[test]
    fn test_duplicate_is_constraint_error() {
        let store = store();
        store
            .exec("INSERT INTO grants VALUES (?1, ?2)", &["alice".into(), 3i64.into()])
            .unwrap();
        let err = store
            .exec("INSERT INTO grants VALUES (?1, ?2)", &["alice".into(), 3i64.into()])
            .unwrap_err();
        assert!(matches!(err, SQLError::Constraint(_)));
    }

    #[test]
    fn test_batch_commits_all() {
        let store = store();
        let affected = store
            .exec_batch(&[
                Statement::new("INSERT INTO grants VALUES ('a', 1)", vec![]),
                Statement::new("INSERT INTO grants VALUES ('a', 2)", vec![]),
                Statement::new("DELETE FROM grants WHERE gid = 1", vec![]),
            ])
            .unwrap();
        assert_eq!(affected, 3);
        let rows = store.query("SELECT gid FROM grants", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("gid"), Some(2));
    }

    #[test]
    fn test_batch_rolls_back_on_failure() {
        let store = store();
        store
            .exec("INSERT INTO grants VALUES ('a', 1)", &[])
            .unwrap();
        let result = store.exec_batch(&[
            Statement::new("DELETE FROM grants WHERE user_id = 'a'", vec![]),
            Statement::new("INSERT INTO grants VALUES ('a', 2)", vec![]),
            Statement::new("INSERT INTO grants VALUES ('a', 2)", vec![]),
        ]);
        assert!(result.is_err());

        // The delete must not have survived.
        let rows = store.query("SELECT gid FROM grants", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("gid"), Some(1));
    }

    #[test]
    fn test_option_value_binding() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec("CREATE TABLE t (v INTEGER)", &[])
            .unwrap();
        store
            .exec("INSERT INTO t VALUES (?1)", &[Value::from(None::<i64>)])
            .unwrap();
        let rows = store.query("SELECT v FROM t", &[]).unwrap();
        assert_eq!(rows[0].get("v"), Some(&Value::Null));
    }
}
