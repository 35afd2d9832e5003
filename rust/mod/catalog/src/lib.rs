//! Catalog module: video metadata gated by classification and privilege
//! grants.
//!
//! # Resources
//!
//! - **Video**: metadata with an optional classification source and an
//!   optional required privilege point
//! - **VideoView**: per-user view counters
//! - **ClassificationSource**: a classification id plus a minimum layer
//! - **Privilege**: a privilege point, in the authority's id space
//!
//! Every read is checked against the caller's grants, which are pulled
//! from the classification authority and kept in a local store for a
//! configurable number of days.
//!
//! # Usage
//!
//! ```ignore
//! let module = CatalogModule::new(sql, kv, authority, 3, authenticator)?;
//! let router = module.routes(); // Mount under /catalog
//! ```

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use vidcat_core::{Authenticator, Module, ServiceError};
use vidcat_kv::KVStore;
use vidcat_sql::SQLStore;

use crate::service::CatalogService;
use crate::service::authority::GrantAuthority;
use crate::service::cache::ClassificationCache;
use crate::service::grants::GrantStore;
use crate::service::resolver::ClassificationResolver;

/// Catalog module implementing the Module trait.
pub struct CatalogModule {
    service: Arc<CatalogService>,
    resolver: Arc<ClassificationResolver>,
    authenticator: Arc<dyn Authenticator>,
}

impl CatalogModule {
    /// Wire the grant store, cache, resolver and catalog service together.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        kv: Arc<dyn KVStore>,
        authority: Arc<dyn GrantAuthority>,
        expiration_days: i64,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self, ServiceError> {
        let store = GrantStore::new(sql.clone())?;
        let cache = ClassificationCache::new(kv, expiration_days);
        let resolver = Arc::new(ClassificationResolver::new(authority, cache, store));
        let service = CatalogService::new(sql, resolver.clone())?;
        Ok(Self {
            service,
            resolver,
            authenticator,
        })
    }

    pub fn service(&self) -> &Arc<CatalogService> {
        &self.service
    }

    /// The resolver, for background cache eviction.
    pub fn resolver(&self) -> &Arc<ClassificationResolver> {
        &self.resolver
    }
}

impl Module for CatalogModule {
    fn name(&self) -> &str {
        "catalog"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone(), self.authenticator.clone())
    }
}
