use vidcat_core::{ListParams, ListResult, Principal, now_rfc3339};
use vidcat_sql::Value;

use crate::model::{CreatePrivilege, Privilege};
use crate::service::{CatalogError, CatalogService, Filter};

const TABLE: &str = "privileges";

impl CatalogService {
    /// Register a privilege point under the authority's id. Sys-admin only.
    pub fn create_privilege(
        &self,
        principal: &Principal,
        input: CreatePrivilege,
    ) -> Result<Privilege, CatalogError> {
        self.require_sys_admin(principal, "create privileges")?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("privilege name cannot be empty".into()));
        }
        if self.find_privilege(input.id)?.is_some() {
            return Err(CatalogError::Conflict(format!("privilege {} already exists", input.id)));
        }

        let now = now_rfc3339();
        let privilege = Privilege {
            id: input.id,
            name: name.to_string(),
            pp_type: input.pp_type.trim().to_string(),
            created_at: now.clone(),
        };

        self.insert_record(
            TABLE,
            Value::Integer(privilege.id),
            &privilege,
            &[
                ("name", Value::from(privilege.name.as_str())),
                ("pp_type", Value::from(privilege.pp_type.as_str())),
                ("created_at", Value::Text(now)),
            ],
        )?;
        Ok(privilege)
    }

    pub fn get_privilege(&self, id: i64) -> Result<Privilege, CatalogError> {
        self.get_record(TABLE, Value::Integer(id))
    }

    pub(crate) fn find_privilege(&self, id: i64) -> Result<Option<Privilege>, CatalogError> {
        self.find_record(TABLE, Value::Integer(id))
    }

    /// Search privileges; `q` matches name or type.
    pub fn search_privileges(&self, params: &ListParams) -> Result<ListResult<Privilege>, CatalogError> {
        let filters: Vec<Filter> = params
            .query()
            .map(|q| Filter::Contains(&["name", "pp_type"], q))
            .into_iter()
            .collect();
        let (items, total) = self.list_records(TABLE, &filters, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Delete a privilege. Sys-admin only; refused while any video requires it.
    pub fn delete_privilege(&self, principal: &Principal, id: i64) -> Result<(), CatalogError> {
        self.require_sys_admin(principal, "delete privileges")?;

        let users = self.count_where("videos", "privilege_id", Value::Integer(id))?;
        if users > 0 {
            return Err(CatalogError::Validation(format!(
                "privilege {} is still required by {} video(s)",
                id, users
            )));
        }
        self.delete_record(TABLE, Value::Integer(id))
    }
}
