use vidcat_core::{ListParams, ListResult, Principal, new_id, now_rfc3339};
use vidcat_sql::Value;

use crate::model::{ClassificationSource, CreateClassificationSource, Layer, SourceQuery};
use crate::service::{CatalogError, CatalogService, Filter};

const TABLE: &str = "classification_sources";

impl CatalogService {
    /// Register a classification source. Sys-admin only.
    pub fn create_source(
        &self,
        principal: &Principal,
        input: CreateClassificationSource,
    ) -> Result<ClassificationSource, CatalogError> {
        self.require_sys_admin(principal, "create classification sources")?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("source name cannot be empty".into()));
        }
        let layer = Layer::new(input.layer).ok_or_else(|| {
            CatalogError::Validation(format!(
                "layer {} is outside {}..={}",
                input.layer,
                Layer::MIN,
                Layer::MAX
            ))
        })?;

        let now = now_rfc3339();
        let source = ClassificationSource {
            id: new_id(),
            name: name.to_string(),
            classification_id: input.classification_id,
            layer,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        self.insert_record(
            TABLE,
            Value::from(source.id.as_str()),
            &source,
            &[
                ("name", Value::from(source.name.as_str())),
                ("classification_id", Value::Integer(source.classification_id)),
                ("layer", Value::Integer(layer.into())),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )?;
        Ok(source)
    }

    /// Get a source by id. Sources carry no secrets, so any caller may read.
    pub fn get_source(&self, id: &str) -> Result<ClassificationSource, CatalogError> {
        self.get_record(TABLE, id.into())
    }

    pub(crate) fn find_source(&self, id: &str) -> Result<Option<ClassificationSource>, CatalogError> {
        self.find_record(TABLE, id.into())
    }

    /// Search sources by name substring and/or classification id.
    pub fn search_sources(
        &self,
        query: &SourceQuery,
        params: &ListParams,
    ) -> Result<ListResult<ClassificationSource>, CatalogError> {
        let mut filters = Vec::new();
        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            filters.push(Filter::Contains(&["name"], q.to_string()));
        }
        if let Some(cid) = query.classification_id {
            filters.push(Filter::Eq("classification_id", Value::Integer(cid)));
        }
        let (items, total) = self.list_records(TABLE, &filters, params.limit, params.offset)?;
        Ok(ListResult { items, total })
    }

    /// Delete a source. Sys-admin only; refused while any video uses it.
    pub fn delete_source(&self, principal: &Principal, id: &str) -> Result<(), CatalogError> {
        self.require_sys_admin(principal, "delete classification sources")?;

        let users = self.count_where("videos", "classification_source", id.into())?;
        if users > 0 {
            return Err(CatalogError::Validation(format!(
                "classification source {} is still used by {} video(s)",
                id, users
            )));
        }
        self.delete_record(TABLE, id.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreateVideo;
    use crate::service::authority::AuthorityGrants;
    use crate::service::testing::fixture;

    fn admin() -> Principal {
        Principal::sys_admin("root")
    }

    fn input(name: &str, classification_id: i64, layer: i64) -> CreateClassificationSource {
        CreateClassificationSource {
            name: name.into(),
            classification_id,
            layer,
        }
    }

    #[test]
    fn test_source_crud() {
        let fx = fixture(AuthorityGrants::none());
        let svc = &fx.service;

        let created = svc.create_source(&admin(), input("Finance L2", 3, 2)).unwrap();
        assert_eq!(created.layer.value(), 2);

        let fetched = svc.get_source(&created.id).unwrap();
        assert_eq!(fetched.name, "Finance L2");
        assert_eq!(fetched.classification_id, 3);

        svc.delete_source(&admin(), &created.id).unwrap();
        assert!(matches!(svc.get_source(&created.id), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_create_source_validation() {
        let fx = fixture(AuthorityGrants::none());
        let svc = &fx.service;

        assert!(matches!(
            svc.create_source(&admin(), input("  ", 1, 1)),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            svc.create_source(&admin(), input("x", 1, 5)),
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            svc.create_source(&admin(), input("x", 1, -1)),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_source_writes_require_sys_admin() {
        let fx = fixture(AuthorityGrants::none());
        let svc = &fx.service;
        let user = Principal::user("alice");

        assert!(matches!(
            svc.create_source(&user, input("x", 1, 1)),
            Err(CatalogError::Forbidden(_))
        ));
        let s = svc.create_source(&admin(), input("x", 1, 1)).unwrap();
        assert!(matches!(
            svc.delete_source(&user, &s.id),
            Err(CatalogError::Forbidden(_))
        ));
    }

    #[test]
    fn test_search_sources() {
        let fx = fixture(AuthorityGrants::none());
        let svc = &fx.service;
        svc.create_source(&admin(), input("Finance L2", 3, 2)).unwrap();
        svc.create_source(&admin(), input("Finance L4", 3, 4)).unwrap();
        svc.create_source(&admin(), input("Legal", 7, 1)).unwrap();

        let all = svc
            .search_sources(&SourceQuery::default(), &ListParams::default())
            .unwrap();
        assert_eq!(all.total, 3);

        let by_name = SourceQuery {
            q: Some("FINANCE".into()),
            classification_id: None,
        };
        assert_eq!(svc.search_sources(&by_name, &ListParams::default()).unwrap().total, 2);

        let by_id = SourceQuery {
            q: None,
            classification_id: Some(7),
        };
        let found = svc.search_sources(&by_id, &ListParams::default()).unwrap();
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].name, "Legal");
    }

    #[test]
    fn test_search_sources_matches_wildcards_literally() {
        let fx = fixture(AuthorityGrants::none());
        let svc = &fx.service;
        svc.create_source(&admin(), input("ops_2", 7, 2)).unwrap();
        svc.create_source(&admin(), input("ops-2", 7, 3)).unwrap();
        svc.create_source(&admin(), input("50% budget", 3, 1)).unwrap();

        let named = |q: &str| SourceQuery {
            q: Some(q.into()),
            classification_id: None,
        };
        let found = svc.search_sources(&named("ops_2"), &ListParams::default()).unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].name, "ops_2");

        let found = svc.search_sources(&named("0%"), &ListParams::default()).unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].name, "50% budget");

        assert_eq!(svc.search_sources(&named("ops"), &ListParams::default()).unwrap().total, 2);
    }

    #[test]
    fn test_delete_source_in_use_is_rejected() {
        let fx = fixture(AuthorityGrants::none());
        let svc = &fx.service;
        let s = svc.create_source(&admin(), input("Secret", 1, 3)).unwrap();
        svc.create_video(
            &admin(),
            CreateVideo {
                title: "briefing".into(),
                description: String::new(),
                classification_source: Some(s.id.clone()),
                privilege: None,
            },
        )
        .unwrap();

        assert!(matches!(
            svc.delete_source(&admin(), &s.id),
            Err(CatalogError::Validation(_))
        ));
    }
}
