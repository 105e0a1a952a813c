//! User accounts: identity, credential hash, role assignments, MFA state
//! and lockout bookkeeping. Users are never hard-deleted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::permission::Permission;
use crate::store::Record;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
});

/// Canonical form used for lookups and the uniqueness key: trimmed,
/// lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn validate_email(email: &str) -> AuthResult<String> {
    let normalized = normalize_email(email);
    if EMAIL_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(AuthError::InvalidEmail { email: email.to_string() })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Normalized (lowercase, trimmed), unique across the store.
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub extra_permissions: Vec<Permission>,
    #[serde(default)]
    pub mfa_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_codes: Option<Vec<String>>,
    #[serde(default)]
    pub failed_login_attempts: u32,
    /// 0 when not locked, otherwise the epoch-ms the lock ends.
    #[serde(default)]
    pub locked_until: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn new(
        id: String,
        email: String,
        password_hash: String,
        roles: Vec<String>,
        extra_permissions: Vec<Permission>,
        now_ms: i64,
    ) -> Self {
        Self {
            id,
            email,
            password_hash,
            roles,
            extra_permissions,
            mfa_enabled: false,
            mfa_secret: None,
            recovery_codes: None,
            failed_login_attempts: 0,
            locked_until: 0,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Lock state is derived: an elapsed `locked_until` means unlocked.
    pub fn is_locked(&self, now_ms: i64) -> bool {
        self.locked_until > 0 && now_ms < self.locked_until
    }

    /// Shared failed-attempt bump for bad passwords and bad MFA codes.
    /// The counter survives an expired lock until a successful login
    /// resets it, so the next failure after the window re-locks.
    pub fn register_failure(&mut self, max_attempts: u32, lock_duration_ms: i64, now_ms: i64) {
        self.failed_login_attempts += 1;
        if self.failed_login_attempts >= max_attempts {
            self.locked_until = now_ms + lock_duration_ms;
        }
        self.updated_at = now_ms;
    }

    pub fn clear_failures(&mut self, now_ms: i64) {
        self.failed_login_attempts = 0;
        self.locked_until = 0;
        self.updated_at = now_ms;
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms;
    }
}

impl Record for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }
}

/// Redacted view handed to callers: no hash, no secret, no recovery codes,
/// with the computed effective permission set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub roles: Vec<String>,
    pub permissions: Vec<Permission>,
    pub mfa_enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PublicUser {
    pub fn from_user(user: &User, effective_permissions: Vec<Permission>) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            permissions: effective_permissions,
            mfa_enabled: user.mfa_enabled,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
