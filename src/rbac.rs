//! RBAC evaluation: a user's effective permission set and the queries
//! and assertions over it.
//!
//! The role catalog is an explicitly-passed read-only snapshot, never
//! ambient state, so evaluation stays deterministic and testable.

use std::collections::HashMap;

use crate::error::{AuthError, AuthResult};
use crate::permission::{covers_all, covers_any, Permission};
use crate::role::{self, Role};
use crate::store::{RecordStore, StoreResult};
use crate::user::User;

/// A read-only snapshot of stored role definitions, keyed by exact name.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: HashMap<String, Role>,
}

impl RoleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self { roles: roles.into_iter().map(|r| (r.name.clone(), r)).collect() }
    }

    /// Snapshot the role store. The catalog does not observe later writes.
    pub async fn load(store: &dyn RecordStore<Role>) -> StoreResult<Self> {
        Ok(Self::from_roles(store.list_all().await?))
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Resolve one role name. Catalog wins on exact match; a name absent from
/// the catalog falls back to the built-in preset of the same name; a name
/// matching neither resolves to zero permissions. The partial fallback is
/// deliberate (see DESIGN.md): unknown custom roles grant nothing.
fn resolve_role(name: &str, catalog: Option<&RoleCatalog>) -> Vec<Permission> {
    if let Some(role) = catalog.and_then(|c| c.get(name)) {
        return role.permissions.clone();
    }
    role::preset_permissions(name)
}

/// The union of the user's resolved role permissions and personal extras,
/// in canonical form.
pub fn effective_permissions(user: &User, catalog: Option<&RoleCatalog>) -> Vec<Permission> {
    let mut perms: Vec<Permission> = Vec::new();
    for name in &user.roles {
        perms.extend(resolve_role(name, catalog));
    }
    perms.extend(user.extra_permissions.iter().copied());
    role::normalize(perms)
}

pub fn user_has_all(user: &User, required: &[Permission], catalog: Option<&RoleCatalog>) -> bool {
    covers_all(&effective_permissions(user, catalog), required)
}

pub fn user_has_any(user: &User, required: &[Permission], catalog: Option<&RoleCatalog>) -> bool {
    let effective = effective_permissions(user, catalog);
    required.iter().any(|r| covers_any(&effective, r))
}

/// Hard-stop variant: fails with the list of grants that were missing.
pub fn assert_all(user: &User, required: &[Permission], catalog: Option<&RoleCatalog>) -> AuthResult<()> {
    let effective = effective_permissions(user, catalog);
    let missing: Vec<Permission> =
        required.iter().filter(|r| !covers_any(&effective, r)).copied().collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied { missing })
    }
}

/// Hard-stop variant of the any-query: reports the full required list,
/// since no single grant can be blamed.
pub fn assert_any(user: &User, required: &[Permission], catalog: Option<&RoleCatalog>) -> AuthResult<()> {
    if user_has_any(user, required, catalog) {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied { missing: required.to_vec() })
    }
}
