use std::sync::Arc;

use tracing::{debug, error};

use crate::model::UserGrants;
use crate::service::CatalogError;
use crate::service::authority::GrantAuthority;
use crate::service::cache::ClassificationCache;
use crate::service::grants::GrantStore;

/// Entry point for "what may this user see".
///
/// Serves stored grants while the user's cache entry is fresh, otherwise
/// pulls a new set from the authority and replaces the stored one first.
/// Concurrent resolves of the same stale user may both refresh; the last
/// replace wins and both derive from the same authority.
pub struct ClassificationResolver {
    authority: Arc<dyn GrantAuthority>,
    cache: ClassificationCache,
    store: GrantStore,
}

impl ClassificationResolver {
    pub fn new(
        authority: Arc<dyn GrantAuthority>,
        cache: ClassificationCache,
        store: GrantStore,
    ) -> Self {
        Self {
            authority,
            cache,
            store,
        }
    }

    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }

    /// Current grants for `user_id`, refreshing them first when stale.
    ///
    /// Authority trouble shows up as empty grants, never as an error. Only
    /// storage failures are returned; when one hits the refresh, the cache
    /// entry is dropped so the next call tries again.
    pub async fn resolve(&self, user_id: &str) -> Result<UserGrants, CatalogError> {
        if !self.cache.is_stale(user_id)? {
            return self.store.get_current(user_id);
        }

        debug!(user_id, "refreshing classification grants");
        let fetched = self.authority.fetch(user_id).await;

        if let Err(e) = self.store.replace(
            user_id,
            fetched.classifications.as_deref(),
            fetched.privileges.as_deref(),
        ) {
            error!(user_id, error = %e, "failed to store refreshed grants");
            if let Err(e) = self.cache.invalidate(user_id) {
                error!(user_id, error = %e, "failed to invalidate classification cache entry");
            }
            return Err(e);
        }

        self.store.get_current(user_id)
    }
}
