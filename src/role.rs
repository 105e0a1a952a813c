//! Roles: named bundles of permissions.
//!
//! A role is either one of the built-in presets, a preset extended with
//! custom extras, or a fully custom bundle. Permission lists are always
//! kept in canonical form (valid, deduplicated, catalog order with
//! wildcards last) so role equality and serialization are deterministic.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::permission::{Action, Permission, Resource, RESOURCES};
use crate::store::Record;

pub const PRESET_ADMIN: &str = "admin";
pub const PRESET_SECURITY_ANALYST: &str = "security-analyst";
pub const PRESET_SUPPORT: &str = "support";
pub const PRESET_USER: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Stored role records are keyed by name, so a role catalog is just a
// record store over `Role`.
impl Record for Role {
    fn id(&self) -> &str {
        &self.name
    }
}

/// Input for [`build_role`].
#[derive(Debug, Clone, Default)]
pub struct RoleSpec {
    pub name: String,
    pub description: Option<String>,
    pub extra_permissions: Vec<Permission>,
}

fn grant(resource: Resource, action: Action) -> Permission {
    Permission::of(resource, action).expect("preset grant is in the catalog")
}

static ADMIN_PERMS: Lazy<Vec<Permission>> =
    Lazy::new(|| RESOURCES.iter().map(|&r| Permission::wildcard(r)).collect());

static SECURITY_ANALYST_PERMS: Lazy<Vec<Permission>> = Lazy::new(|| {
    vec![
        grant(Resource::User, Action::Read),
        grant(Resource::User, Action::List),
        grant(Resource::Session, Action::Read),
        grant(Resource::Session, Action::List),
        grant(Resource::Session, Action::Invalidate),
        grant(Resource::Audit, Action::Read),
        grant(Resource::Audit, Action::List),
    ]
});

static SUPPORT_PERMS: Lazy<Vec<Permission>> = Lazy::new(|| {
    vec![
        grant(Resource::User, Action::Read),
        grant(Resource::User, Action::Update),
        grant(Resource::User, Action::List),
        grant(Resource::Session, Action::Read),
        grant(Resource::Session, Action::List),
        grant(Resource::Session, Action::Invalidate),
        grant(Resource::Mfa, Action::Setup),
    ]
});

static USER_PERMS: Lazy<Vec<Permission>> = Lazy::new(|| {
    vec![
        grant(Resource::User, Action::Read),
        grant(Resource::User, Action::Update),
        grant(Resource::Session, Action::List),
        grant(Resource::Mfa, Action::Setup),
        grant(Resource::Mfa, Action::Verify),
        grant(Resource::Auth, Action::Login),
        grant(Resource::Auth, Action::Logout),
    ]
});

/// Permissions of a built-in preset. Unknown names are not an error: they
/// denote custom roles with no implicit grants, so the result is empty.
pub fn preset_permissions(name: &str) -> Vec<Permission> {
    match name {
        PRESET_ADMIN => ADMIN_PERMS.clone(),
        PRESET_SECURITY_ANALYST => SECURITY_ANALYST_PERMS.clone(),
        PRESET_SUPPORT => SUPPORT_PERMS.clone(),
        PRESET_USER => USER_PERMS.clone(),
        _ => Vec::new(),
    }
}

pub fn is_preset(name: &str) -> bool {
    matches!(name, PRESET_ADMIN | PRESET_SECURITY_ANALYST | PRESET_SUPPORT | PRESET_USER)
}

/// Canonical form: deduplicated, catalog order, wildcards last.
/// Idempotent and independent of input order.
pub fn normalize(permissions: impl IntoIterator<Item = Permission>) -> Vec<Permission> {
    let mut out: Vec<Permission> = permissions.into_iter().collect();
    out.sort();
    out.dedup();
    out
}

/// Build a role from a preset name (if it matches one) plus custom extras.
pub fn build_role(spec: RoleSpec) -> Role {
    let mut perms = preset_permissions(&spec.name);
    perms.extend(spec.extra_permissions);
    Role {
        name: spec.name,
        permissions: normalize(perms),
        description: spec.description,
    }
}

/// Union of all the given roles' permissions, in canonical form. Used to
/// compute effective permissions across multiple assigned roles.
pub fn merge_roles<'a>(roles: impl IntoIterator<Item = &'a Role>) -> Vec<Permission> {
    normalize(roles.into_iter().flat_map(|r| r.permissions.iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Permission {
        Permission::parse(s).unwrap()
    }

    #[test]
    fn admin_preset_is_all_wildcards() {
        let perms = preset_permissions(PRESET_ADMIN);
        assert_eq!(perms.len(), RESOURCES.len());
        assert!(perms.iter().all(|x| x.is_wildcard()));
    }

    #[test]
    fn unknown_preset_grants_nothing() {
        assert!(preset_permissions("auditor-on-call").is_empty());
        assert!(!is_preset("auditor-on-call"));
        assert!(is_preset("security-analyst"));
    }

    #[test]
    fn normalize_is_idempotent_and_order_independent() {
        let a = vec![p("session:list"), p("user:*"), p("user:read"), p("session:list")];
        let b = vec![p("user:read"), p("session:list"), p("user:*")];
        let na = normalize(a);
        let nb = normalize(b);
        assert_eq!(na, nb);
        assert_eq!(normalize(na.clone()), na);
        // wildcard sorted after concrete grants
        assert_eq!(na.last().unwrap().to_string(), "user:*");
    }

    #[test]
    fn build_role_admin_matches_preset_exactly() {
        let role = build_role(RoleSpec { name: PRESET_ADMIN.into(), ..Default::default() });
        assert_eq!(role.permissions, normalize(preset_permissions(PRESET_ADMIN)));
    }

    #[test]
    fn build_role_merges_extras_into_preset() {
        let role = build_role(RoleSpec {
            name: PRESET_USER.into(),
            description: Some("standard account".into()),
            extra_permissions: vec![p("audit:read"), p("user:read")],
        });
        assert!(role.permissions.contains(&p("audit:read")));
        // duplicate of a preset grant collapses
        assert_eq!(role.permissions.iter().filter(|x| **x == p("user:read")).count(), 1);
    }

    #[test]
    fn merge_admin_and_support_is_deduplicated_union() {
        let admin = build_role(RoleSpec { name: PRESET_ADMIN.into(), ..Default::default() });
        let support = build_role(RoleSpec { name: PRESET_SUPPORT.into(), ..Default::default() });
        let merged = merge_roles([&admin, &support]);
        let mut expected = preset_permissions(PRESET_ADMIN);
        expected.extend(preset_permissions(PRESET_SUPPORT));
        assert_eq!(merged, normalize(expected));
        // no duplicates survive the merge
        let mut seen = merged.clone();
        seen.dedup();
        assert_eq!(seen.len(), merged.len());
    }

    #[test]
    fn role_serialization_is_deterministic() {
        let a = build_role(RoleSpec {
            name: PRESET_SUPPORT.into(),
            extra_permissions: vec![p("audit:read"), p("user:read")],
            ..Default::default()
        });
        let b = build_role(RoleSpec {
            name: PRESET_SUPPORT.into(),
            extra_permissions: vec![p("user:read"), p("audit:read")],
            ..Default::default()
        });
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
