//! Permission vocabulary and implication logic.
//!
//! A permission is `resource:action` or `resource:*`, drawn from a closed
//! catalog. Values are constructed only through the validating parser or
//! the checked constructors here; nothing else in the crate assembles
//! permission strings by hand, so catalog membership holds everywhere.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    User,
    Role,
    Session,
    Mfa,
    Auth,
    Audit,
    Oauth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Assign,
    Verify,
    Setup,
    Login,
    Logout,
    List,
    Invalidate,
    Rotate,
}

pub const RESOURCES: &[Resource] = &[
    Resource::User,
    Resource::Role,
    Resource::Session,
    Resource::Mfa,
    Resource::Auth,
    Resource::Audit,
    Resource::Oauth,
];

/// The canonical catalog. Order is meaningful: `normalize` sorts by the
/// index into this table, wildcards after all concrete grants.
pub const CATALOG: &[(Resource, Action)] = &[
    (Resource::User, Action::Create),
    (Resource::User, Action::Read),
    (Resource::User, Action::Update),
    (Resource::User, Action::Delete),
    (Resource::User, Action::List),
    (Resource::Role, Action::Create),
    (Resource::Role, Action::Read),
    (Resource::Role, Action::Update),
    (Resource::Role, Action::Delete),
    (Resource::Role, Action::Assign),
    (Resource::Role, Action::List),
    (Resource::Session, Action::Read),
    (Resource::Session, Action::List),
    (Resource::Session, Action::Invalidate),
    (Resource::Session, Action::Rotate),
    (Resource::Mfa, Action::Setup),
    (Resource::Mfa, Action::Verify),
    (Resource::Auth, Action::Login),
    (Resource::Auth, Action::Logout),
    (Resource::Audit, Action::Read),
    (Resource::Audit, Action::List),
    (Resource::Oauth, Action::Login),
    (Resource::Oauth, Action::Rotate),
];

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Role => "role",
            Resource::Session => "session",
            Resource::Mfa => "mfa",
            Resource::Auth => "auth",
            Resource::Audit => "audit",
            Resource::Oauth => "oauth",
        }
    }

    fn parse(s: &str) -> Option<Resource> {
        RESOURCES.iter().copied().find(|r| r.as_str() == s)
    }

    fn index(&self) -> usize {
        RESOURCES.iter().position(|r| r == self).unwrap_or(usize::MAX)
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Assign => "assign",
            Action::Verify => "verify",
            Action::Setup => "setup",
            Action::Login => "login",
            Action::Logout => "logout",
            Action::List => "list",
            Action::Invalidate => "invalidate",
            Action::Rotate => "rotate",
        }
    }

    fn parse(s: &str) -> Option<Action> {
        const ALL: &[Action] = &[
            Action::Create,
            Action::Read,
            Action::Update,
            Action::Delete,
            Action::Assign,
            Action::Verify,
            Action::Setup,
            Action::Login,
            Action::Logout,
            Action::List,
            Action::Invalidate,
            Action::Rotate,
        ];
        ALL.iter().copied().find(|a| a.as_str() == s)
    }
}

/// A validated grant token. `action == None` is the per-resource wildcard.
/// There is no cross-resource or global wildcard: least privilege by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    resource: Resource,
    action: Option<Action>,
}

impl Permission {
    /// Parse and validate a `resource:action` / `resource:*` token.
    pub fn parse(s: &str) -> Result<Permission, AuthError> {
        let reject = || AuthError::InvalidPermission { token: s.to_string() };
        let (res, act) = s.split_once(':').ok_or_else(reject)?;
        let resource = Resource::parse(res).ok_or_else(reject)?;
        if act == "*" {
            return Ok(Permission { resource, action: None });
        }
        let action = Action::parse(act).ok_or_else(reject)?;
        Permission::of(resource, action).map_err(|_| reject())
    }

    /// Checked constructor: the pair must exist in the canonical catalog.
    pub fn of(resource: Resource, action: Action) -> Result<Permission, AuthError> {
        if CATALOG.contains(&(resource, action)) {
            Ok(Permission { resource, action: Some(action) })
        } else {
            Err(AuthError::InvalidPermission {
                token: format!("{}:{}", resource.as_str(), action.as_str()),
            })
        }
    }

    /// The per-resource wildcard, always valid.
    pub fn wildcard(resource: Resource) -> Permission {
        Permission { resource, action: None }
    }

    pub fn is_valid(s: &str) -> bool {
        Permission::parse(s).is_ok()
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn is_wildcard(&self) -> bool {
        self.action.is_none()
    }

    /// True iff this grant satisfies `required`: same resource, and either
    /// this grant is the wildcard or the actions match exactly.
    pub fn implies(&self, required: &Permission) -> bool {
        if self.resource != required.resource {
            return false;
        }
        match (self.action, required.action) {
            (None, _) => true,
            (Some(a), Some(b)) => a == b,
            (Some(_), None) => false,
        }
    }

    /// Sort key: concrete grants in catalog order, wildcards after them in
    /// resource order. Dedup after sorting yields the canonical form.
    pub(crate) fn sort_key(&self) -> (u8, usize) {
        match self.action {
            Some(action) => {
                let idx = CATALOG
                    .iter()
                    .position(|&(r, a)| r == self.resource && a == action)
                    .unwrap_or(usize::MAX);
                (0, idx)
            }
            None => (1, self.resource.index()),
        }
    }
}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permission {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Some(a) => write!(f, "{}:{}", self.resource.as_str(), a.as_str()),
            None => write!(f, "{}:*", self.resource.as_str()),
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = AuthError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s)
    }
}

// Serialized as the string form so records stay human-readable.
impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Permission::parse(&s).map_err(D::Error::custom)
    }
}

/// True iff some grant implies `required`.
pub fn covers_any(grants: &[Permission], required: &Permission) -> bool {
    grants.iter().any(|g| g.implies(required))
}

/// True iff every entry of `required` is implied by some grant.
pub fn covers_all(grants: &[Permission], required: &[Permission]) -> bool {
    required.iter().all(|r| covers_any(grants, r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_permission_implies_itself() {
        for &(r, a) in CATALOG {
            let p = Permission::of(r, a).unwrap();
            assert!(p.implies(&p), "{p} must imply itself");
        }
    }

    #[test]
    fn wildcard_implies_every_action_of_its_resource() {
        for &(r, a) in CATALOG {
            let w = Permission::wildcard(r);
            let p = Permission::of(r, a).unwrap();
            assert!(w.implies(&p), "{w} must imply {p}");
            assert!(!p.implies(&w), "{p} must not imply the wildcard");
        }
    }

    #[test]
    fn wildcards_never_cross_resources() {
        let w = Permission::wildcard(Resource::User);
        let other = Permission::of(Resource::Session, Action::Read).unwrap();
        assert!(!w.implies(&other));
        assert!(!Permission::wildcard(Resource::Session).implies(&Permission::of(Resource::User, Action::Read).unwrap()));
    }

    #[test]
    fn parse_accepts_catalog_members_only() {
        assert!(Permission::is_valid("user:read"));
        assert!(Permission::is_valid("session:invalidate"));
        assert!(Permission::is_valid("oauth:rotate"));
        assert!(Permission::is_valid("audit:*"));
        // real resource + real action, but not a catalog pair
        assert!(!Permission::is_valid("user:login"));
        assert!(!Permission::is_valid("mfa:create"));
        // unknown tokens and malformed shapes
        assert!(!Permission::is_valid("backup:read"));
        assert!(!Permission::is_valid("user:frobnicate"));
        assert!(!Permission::is_valid("user"));
        assert!(!Permission::is_valid("user:read:extra"));
        assert!(!Permission::is_valid(""));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for &(r, a) in CATALOG {
            let p = Permission::of(r, a).unwrap();
            assert_eq!(Permission::parse(&p.to_string()).unwrap(), p);
        }
        let w = Permission::wildcard(Resource::Mfa);
        assert_eq!(Permission::parse("mfa:*").unwrap(), w);
    }

    #[test]
    fn ordering_puts_wildcards_last() {
        let mut perms = vec![
            Permission::wildcard(Resource::User),
            Permission::parse("role:read").unwrap(),
            Permission::parse("user:create").unwrap(),
        ];
        perms.sort();
        assert_eq!(perms[0].to_string(), "user:create");
        assert_eq!(perms[1].to_string(), "role:read");
        assert_eq!(perms[2].to_string(), "user:*");
    }

    #[test]
    fn coverage_helpers() {
        let grants = vec![
            Permission::parse("user:*").unwrap(),
            Permission::parse("audit:read").unwrap(),
        ];
        assert!(covers_any(&grants, &Permission::parse("user:delete").unwrap()));
        assert!(covers_all(
            &grants,
            &[Permission::parse("user:read").unwrap(), Permission::parse("audit:read").unwrap()],
        ));
        assert!(!covers_all(
            &grants,
            &[Permission::parse("user:read").unwrap(), Permission::parse("audit:list").unwrap()],
        ));
    }

    #[test]
    fn serde_uses_string_form() {
        let p = Permission::parse("session:invalidate").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"session:invalidate\"");
        let back: Permission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<Permission>("\"nope:never\"").is_err());
    }
}
