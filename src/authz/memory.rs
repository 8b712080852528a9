//! In-memory permission table, used by `AppState::fake()` and tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::authz::repo::{AccessRepo, Permission, Resource};
use crate::authz::resource::Method;

#[derive(Default)]
struct Tables {
    resources: Vec<Resource>,
    user_roles: HashMap<Uuid, HashSet<Uuid>>,
    permissions: Vec<Permission>,
}

#[derive(Default)]
pub struct MemoryAccessRepo {
    tables: Mutex<Tables>,
}

impl MemoryAccessRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource row and return its id.
    pub fn add_resource(&self, name: &str, method: Method) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().resources.push(Resource {
            id,
            name: name.to_string(),
            method: method.as_str().to_string(),
            description: None,
        });
        id
    }

    pub fn grant_role(&self, user_id: Uuid, role_id: Uuid) {
        self.tables
            .lock()
            .unwrap()
            .user_roles
            .entry(user_id)
            .or_default()
            .insert(role_id);
    }

    pub fn revoke_role(&self, user_id: Uuid, role_id: Uuid) {
        if let Some(roles) = self.tables.lock().unwrap().user_roles.get_mut(&user_id) {
            roles.remove(&role_id);
        }
    }

    /// Upsert the single permission row for `(role_id, resource_id)`.
    pub fn set_permission(&self, role_id: Uuid, resource_id: Uuid, can_access: bool) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(row) = tables
            .permissions
            .iter_mut()
            .find(|p| p.role_id == role_id && p.resource_id == resource_id)
        {
            row.can_access = can_access;
            return;
        }
        tables.permissions.push(Permission {
            id: Uuid::new_v4(),
            role_id,
            resource_id,
            can_access,
            created_at: OffsetDateTime::now_utc(),
        });
    }
}

#[async_trait]
impl AccessRepo for MemoryAccessRepo {
    async fn find_resource(&self, name: &str, method: Method) -> anyhow::Result<Option<Resource>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .resources
            .iter()
            .find(|r| r.name == name && r.method == method.as_str())
            .cloned())
    }

    async fn role_ids_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .user_roles
            .get(&user_id)
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn any_role_allows(&self, role_ids: &[Uuid], resource_id: Uuid) -> anyhow::Result<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.permissions.iter().any(|p| {
            p.resource_id == resource_id && p.can_access && role_ids.contains(&p.role_id)
        }))
    }
}
