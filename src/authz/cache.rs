use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::AppResult;
use crate::models::role::{ActionValue, Permission, PermissionValue, Role, RolePermissions};
use crate::repositories::RoleRepository;

/// Immutable view of all roles and their permissions.
#[derive(Debug, Default)]
pub struct PermissionSnapshot {
    roles: Vec<Role>,
    role_permissions: Vec<RolePermissions>,
    index: HashMap<i64, HashMap<String, PermissionValue>>,
}

impl PermissionSnapshot {
    pub fn build(roles: Vec<Role>, permissions: Vec<Permission>) -> Self {
        let mut index: HashMap<i64, HashMap<String, PermissionValue>> = HashMap::new();
        let mut grouped: HashMap<i64, Vec<ActionValue>> = HashMap::new();

        for permission in permissions {
            index
                .entry(permission.role_id)
                .or_default()
                .insert(permission.action.clone(), permission.value);
            grouped.entry(permission.role_id).or_default().push(ActionValue {
                action: permission.action,
                value: permission.value,
            });
        }

        let role_permissions = roles
            .iter()
            .map(|role| RolePermissions {
                role_id: role.id,
                permissions: grouped.remove(&role.id).unwrap_or_default(),
            })
            .collect();

        Self {
            roles,
            role_permissions,
            index,
        }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Permissions of a role; an unknown role has an empty set.
    pub fn role_permissions(&self, role_id: i64) -> RolePermissions {
        self.role_permissions
            .iter()
            .find(|rp| rp.role_id == role_id)
            .cloned()
            .unwrap_or(RolePermissions {
                role_id,
                permissions: Vec::new(),
            })
    }

    /// `none` for any role or action the snapshot does not know.
    pub fn permission_for(&self, role_id: i64, action: &str) -> PermissionValue {
        self.index
            .get(&role_id)
            .and_then(|actions| actions.get(action))
            .copied()
            .unwrap_or(PermissionValue::None)
    }

    /// Resolves role ids in snapshot order; unknown ids are dropped.
    pub fn roles_by_ids(&self, ids: &[i64]) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|role| ids.contains(&role.id))
            .cloned()
            .collect()
    }
}

/// Process-wide permission cache.
///
/// Readers clone the current `Arc<PermissionSnapshot>` and work on it; a
/// rebuild builds a complete new snapshot off to the side and swaps the
/// pointer, so nobody ever sees roles from one generation mixed with
/// permissions from another. Rebuilds run one at a time, from fetch to
/// swap, so a slow rebuild can never install data older than a later one.
pub struct PermissionCache {
    store: Arc<dyn RoleRepository>,
    snapshot: RwLock<Arc<PermissionSnapshot>>,
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl PermissionCache {
    pub fn new(store: Arc<dyn RoleRepository>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(Arc::new(PermissionSnapshot::default())),
            rebuild_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Reloads roles and permissions, fetched concurrently. If either fetch
    /// fails the current snapshot stays in place and the error is returned.
    pub async fn rebuild(&self) -> AppResult<()> {
        let _writer = self.rebuild_lock.lock().await;
        let fetched = tokio::try_join!(self.store.all_roles(), self.store.all_permissions());

        let (roles, permissions) = match fetched {
            Ok(data) => data,
            Err(err) => {
                tracing::error!(error = %err, "permission cache rebuild failed, keeping previous snapshot");
                return Err(err);
            }
        };

        let snapshot = Arc::new(PermissionSnapshot::build(roles, permissions));
        let role_count = snapshot.roles().len();
        *self.snapshot.write() = snapshot;

        tracing::info!(roles = role_count, "permission cache rebuilt");
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<PermissionSnapshot> {
        Arc::clone(&*self.snapshot.read())
    }

    pub fn permission_for(&self, role_id: i64, action: &str) -> PermissionValue {
        self.snapshot().permission_for(role_id, action)
    }

    pub fn roles_by_ids(&self, ids: &[i64]) -> Vec<Role> {
        self.snapshot().roles_by_ids(ids)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.snapshot().roles().to_vec()
    }
}

impl std::fmt::Debug for PermissionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCache")
            .field("snapshot", &*self.snapshot.read())
            .finish()
    }
}
