//! Allow/deny decisions for single videos and for listings.
//!
//! Both paths evaluate the same two checks against a user's grants:
//!
//! - classification: the video's source names a classification id and a
//!   minimum layer; the user needs a grant for that id at that layer or
//!   higher.
//! - privilege: the video names a privilege point; the user needs to hold it.
//!
//! Sys-admins pass everything.

use std::collections::{HashMap, HashSet};

use crate::model::{ClassificationGate, ClassificationRequirement, Layer, UserGrants, VideoAccess};

/// Whether a user holding `grants` may view a video demanding `access`.
pub fn can_view(access: &VideoAccess, grants: &UserGrants, is_sys_admin: bool) -> bool {
    if is_sys_admin {
        return true;
    }
    let index = GrantIndex::new(grants);
    index.classification_ok(&access.classification)
        && access
            .privilege
            .is_none_or(|req| index.holds_privilege(req.privilege_id))
}

/// Grants keyed for lookup: highest layer per classification id, and the
/// set of held privilege ids.
#[derive(Debug, Clone, Default)]
struct GrantIndex {
    layers: HashMap<i64, Layer>,
    privileges: HashSet<i64>,
}

impl GrantIndex {
    fn new(grants: &UserGrants) -> Self {
        let mut layers: HashMap<i64, Layer> = HashMap::new();
        for g in &grants.classifications {
            let slot = layers.entry(g.classification_id).or_insert(g.layer);
            *slot = (*slot).max(g.layer);
        }
        Self {
            layers,
            privileges: grants.privileges.iter().map(|p| p.privilege_id).collect(),
        }
    }

    fn covers(&self, req: &ClassificationRequirement) -> bool {
        self.layers
            .get(&req.classification_id)
            .is_some_and(|held| held.covers(req.layer))
    }

    fn classification_ok(&self, gate: &ClassificationGate) -> bool {
        match gate {
            ClassificationGate::Unclassified => true,
            ClassificationGate::Required(req) => self.covers(req),
            ClassificationGate::Unresolved => false,
        }
    }

    fn holds_privilege(&self, privilege_id: i64) -> bool {
        self.privileges.contains(&privilege_id)
    }
}

/// First stage of a listing: what the database is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreFilter {
    /// Every video.
    Unrestricted,
    /// Only videos with neither a classification source nor a privilege.
    PublicOnly,
}

impl PreFilter {
    /// SQL condition over the `videos` table, if any.
    pub fn where_clause(self) -> Option<&'static str> {
        match self {
            PreFilter::Unrestricted => None,
            PreFilter::PublicOnly => Some("v.classification_source IS NULL AND v.privilege_id IS NULL"),
        }
    }
}

/// Two-stage filter for listing many videos.
///
/// Stage one narrows the query: a user with no classification grants can
/// only ever be shown public videos. Stage two runs on each joined row:
/// public videos match, otherwise the held privilege (when one is required)
/// and the classification layer (when one is required) must both pass.
#[derive(Debug, Clone)]
pub struct VisibilityFilter {
    pre: PreFilter,
    /// `None` for sys-admins.
    index: Option<GrantIndex>,
}

impl VisibilityFilter {
    pub fn pre_filter(&self) -> PreFilter {
        self.pre
    }

    /// Second-stage predicate for one video after the source join.
    pub fn matches(&self, access: &VideoAccess) -> bool {
        let Some(index) = &self.index else {
            return true;
        };
        if access.is_public() {
            return true;
        }
        let privilege_ok = access
            .privilege
            .is_none_or(|req| index.holds_privilege(req.privilege_id));
        privilege_ok && index.classification_ok(&access.classification)
    }
}

/// Build the listing filter for a user.
pub fn build_visibility_filter(grants: &UserGrants, is_sys_admin: bool) -> VisibilityFilter {
    if is_sys_admin {
        return VisibilityFilter {
            pre: PreFilter::Unrestricted,
            index: None,
        };
    }
    let pre = if grants.classifications.is_empty() {
        PreFilter::PublicOnly
    } else {
        PreFilter::Unrestricted
    };
    VisibilityFilter {
        pre,
        index: Some(GrantIndex::new(grants)),
    }
}
