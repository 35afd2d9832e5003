use std::sync::Arc;

use tracing::debug;

use vidcat_sql::{Row, SQLStore, Statement, Value};

use crate::model::{ClassificationGrant, Layer, PrivilegeGrant, UserGrants};
use crate::service::{CatalogError, schema};

/// Persistent copy of each user's grants as last fetched from the authority.
///
/// Rows are never edited one by one: a refresh deletes everything the user
/// had in a category and inserts the new set, in one transaction.
pub struct GrantStore {
    sql: Arc<dyn SQLStore>,
}

impl GrantStore {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, CatalogError> {
        schema::init_grant_schema(sql.as_ref())?;
        Ok(Self { sql })
    }

    /// Replace both categories. Empty slices leave the user with nothing.
    pub fn replace_all(
        &self,
        user_id: &str,
        classifications: &[ClassificationGrant],
        privileges: &[PrivilegeGrant],
    ) -> Result<(), CatalogError> {
        self.replace(user_id, Some(classifications), Some(privileges))
    }

    /// Replace the categories that are `Some`; a `None` category keeps its
    /// current rows.
    ///
    /// Every inserted row is stamped with `user_id`, whatever the input
    /// records carry.
    pub fn replace(
        &self,
        user_id: &str,
        classifications: Option<&[ClassificationGrant]>,
        privileges: Option<&[PrivilegeGrant]>,
    ) -> Result<(), CatalogError> {
        let mut batch = Vec::new();

        if let Some(grants) = classifications {
            batch.push(Statement::new(
                "DELETE FROM classification_grants WHERE user_id = ?1",
                vec![user_id.into()],
            ));
            for g in grants {
                batch.push(Statement::new(
                    "INSERT INTO classification_grants (user_id, classification_id, layer) VALUES (?1, ?2, ?3)",
                    vec![user_id.into(), g.classification_id.into(), i64::from(g.layer).into()],
                ));
            }
        }

        if let Some(grants) = privileges {
            batch.push(Statement::new(
                "DELETE FROM privilege_grants WHERE user_id = ?1",
                vec![user_id.into()],
            ));
            for g in grants {
                batch.push(Statement::new(
                    "INSERT INTO privilege_grants (user_id, privilege_id, pp_type) VALUES (?1, ?2, ?3)",
                    vec![user_id.into(), g.privilege_id.into(), g.pp_type.clone().into()],
                ));
            }
        }

        if batch.is_empty() {
            return Ok(());
        }
        self.sql.exec_batch(&batch)?;
        debug!(
            user_id,
            classifications = classifications.map(<[_]>::len),
            privileges = privileges.map(<[_]>::len),
            "replaced stored grants"
        );
        Ok(())
    }

    /// What is stored for the user right now. Never fails for an unknown
    /// user; both lists are simply empty.
    pub fn get_current(&self, user_id: &str) -> Result<UserGrants, CatalogError> {
        let rows = self.sql.query(
            "SELECT classification_id, layer FROM classification_grants WHERE user_id = ?1 ORDER BY classification_id",
            &[user_id.into()],
        )?;
        let classifications = rows
            .iter()
            .map(|row| classification_from_row(user_id, row))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self.sql.query(
            "SELECT privilege_id, pp_type FROM privilege_grants WHERE user_id = ?1 ORDER BY privilege_id",
            &[Value::from(user_id)],
        )?;
        let privileges = rows
            .iter()
            .map(|row| privilege_from_row(user_id, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UserGrants {
            classifications,
            privileges,
        })
    }
}

fn classification_from_row(user_id: &str, row: &Row) -> Result<ClassificationGrant, CatalogError> {
    let classification_id = row
        .get_i64("classification_id")
        .ok_or_else(|| CatalogError::Internal("missing classification_id column".into()))?;
    let layer = row
        .get_i64("layer")
        .and_then(Layer::new)
        .ok_or_else(|| CatalogError::Internal("invalid layer column".into()))?;
    Ok(ClassificationGrant {
        user_id: user_id.to_string(),
        classification_id,
        layer,
    })
}

fn privilege_from_row(user_id: &str, row: &Row) -> Result<PrivilegeGrant, CatalogError> {
    let privilege_id = row
        .get_i64("privilege_id")
        .ok_or_else(|| CatalogError::Internal("missing privilege_id column".into()))?;
    Ok(PrivilegeGrant {
        user_id: user_id.to_string(),
        privilege_id,
        pp_type: row.get_str("pp_type").unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{class_grant, pp_grant};
    use vidcat_sql::SqliteStore;

    fn store() -> GrantStore {
        GrantStore::new(Arc::new(SqliteStore::open_in_memory().unwrap())).unwrap()
    }

    #[test]
    fn test_unknown_user_reads_empty() {
        let store = store();
        assert_eq!(store.get_current("nobody").unwrap(), UserGrants::default());
    }

    #[test]
    fn test_replace_all_is_full_replace() {
        let store = store();
        store
            .replace_all("alice", &[class_grant("alice", 1, 2)], &[pp_grant("alice", 10)])
            .unwrap();
        store
            .replace_all("alice", &[class_grant("alice", 9, 4)], &[pp_grant("alice", 11)])
            .unwrap();

        let current = store.get_current("alice").unwrap();
        assert_eq!(current.classifications, vec![class_grant("alice", 9, 4)]);
        assert_eq!(current.privileges, vec![pp_grant("alice", 11)]);
    }

    #[test]
    fn test_replace_all_twice_equals_once() {
        let store = store();
        let classes = [class_grant("alice", 3, 2), class_grant("alice", 7, 4)];
        let pps = [pp_grant("alice", 5), pp_grant("alice", 66)];

        store.replace_all("alice", &classes, &pps).unwrap();
        let once = store.get_current("alice").unwrap();
        store.replace_all("alice", &classes, &pps).unwrap();
        assert_eq!(store.get_current("alice").unwrap(), once);
    }

    #[test]
    fn test_empty_sets_clear_user() {
        let store = store();
        store
            .replace_all("alice", &[class_grant("alice", 1, 1)], &[pp_grant("alice", 1)])
            .unwrap();
        store.replace_all("alice", &[], &[]).unwrap();
        assert!(store.get_current("alice").unwrap().is_empty());
    }

    #[test]
    fn test_absent_category_is_untouched() {
        let store = store();
        store
            .replace_all("alice", &[class_grant("alice", 1, 1)], &[pp_grant("alice", 1)])
            .unwrap();
        store
            .replace("alice", Some(&[class_grant("alice", 2, 3)]), None)
            .unwrap();

        let current = store.get_current("alice").unwrap();
        assert_eq!(current.classifications, vec![class_grant("alice", 2, 3)]);
        assert_eq!(current.privileges, vec![pp_grant("alice", 1)]);
    }

    #[test]
    fn test_users_are_isolated() {
        let store = store();
        store
            .replace_all("alice", &[class_grant("alice", 1, 1)], &[])
            .unwrap();
        store.replace_all("bob", &[], &[]).unwrap();
        assert_eq!(store.get_current("alice").unwrap().classifications.len(), 1);
    }

    #[test]
    fn test_duplicate_input_rolls_back() {
        let store = store();
        store
            .replace_all("alice", &[class_grant("alice", 1, 1)], &[])
            .unwrap();
        let result = store.replace_all(
            "alice",
            &[class_grant("alice", 2, 1), class_grant("alice", 2, 3)],
            &[],
        );
        assert!(matches!(result, Err(CatalogError::Conflict(_))));
        // The previous set survives the failed refresh.
        assert_eq!(
            store.get_current("alice").unwrap().classifications,
            vec![class_grant("alice", 1, 1)]
        );
    }
}
