use std::sync::Arc;

use axum::extract::FromRef;
use tracing::debug;

use crate::auth::Principal;
use crate::authz::repo::AccessRepo;
use crate::authz::resource::ResourceKey;
use crate::state::AppState;

/// Authorization outcome. Deny is an ordinary value, not an error; only a
/// store failure makes `authorize` return `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decides allow/deny for a principal and a resolved resource key by
/// consulting the role-permission table.
#[derive(Clone)]
pub struct PermissionEvaluator {
    access: Arc<dyn AccessRepo>,
}

impl FromRef<AppState> for PermissionEvaluator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.access.clone())
    }
}

impl PermissionEvaluator {
    pub fn new(access: Arc<dyn AccessRepo>) -> Self {
        Self { access }
    }

    /// Default-deny evaluation:
    /// superusers bypass the table entirely; anonymous principals, unknown
    /// resources, empty role sets, and missing permission rows all deny.
    /// A user with several roles is allowed if any one of them grants
    /// access (union semantics).
    pub async fn authorize(
        &self,
        principal: &Principal,
        key: &ResourceKey,
    ) -> anyhow::Result<Decision> {
        if principal.is_superuser() {
            debug!(resource = %key, "superuser bypass");
            return Ok(Decision::Allow);
        }
        let Some(user) = principal.user() else {
            debug!(resource = %key, "anonymous principal");
            return Ok(Decision::Deny);
        };

        let Some(resource) = self.access.find_resource(&key.name, key.method).await? else {
            debug!(resource = %key, "no matching resource row");
            return Ok(Decision::Deny);
        };

        let role_ids = self.access.role_ids_for_user(user.id).await?;
        if role_ids.is_empty() {
            debug!(user_id = %user.id, resource = %key, "user holds no roles");
            return Ok(Decision::Deny);
        }

        let allowed = self.access.any_role_allows(&role_ids, resource.id).await?;
        debug!(user_id = %user.id, resource = %key, allowed, "permission evaluated");
        Ok(if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        })
    }
}
