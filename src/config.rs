//! Orchestrator configuration. Everything that was ambient in older
//! deployments (TTL defaults, lockout thresholds, hash cost) is an
//! explicit struct handed to [`crate::service::AuthService`] at
//! construction.

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Default session TTL when the login request does not give one.
    pub session_ttl_minutes: i64,
    /// Consecutive failed credential/MFA attempts before lockout.
    pub max_failed_attempts: u32,
    /// How long a lockout lasts.
    pub lockout_minutes: i64,
    pub password_policy: PasswordPolicy,
    pub hash_cost: HashCost,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: 60,
            max_failed_attempts: 5,
            lockout_minutes: 15,
            password_policy: PasswordPolicy::default(),
            hash_cost: HashCost::default(),
        }
    }
}

impl AuthConfig {
    pub fn lockout_ms(&self) -> i64 {
        self.lockout_minutes * 60_000
    }
}

/// Hard character-class requirements, not a scored check.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digit: bool,
    pub require_symbol: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_digit: true,
            require_symbol: true,
        }
    }
}

impl PasswordPolicy {
    pub fn validate(&self, password: &str) -> AuthResult<()> {
        let weak = |reason: &str| AuthError::WeakPassword { reason: reason.to_string() };
        if password.chars().count() < self.min_length {
            return Err(weak(&format!("must be at least {} characters", self.min_length)));
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            return Err(weak("must contain a lowercase letter"));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(weak("must contain an uppercase letter"));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(weak("must contain a digit"));
        }
        if self.require_symbol && !password.chars().any(|c| !c.is_alphanumeric()) {
            return Err(weak("must contain a symbol"));
        }
        Ok(())
    }
}

/// Argon2 cost parameters; hashes with weaker embedded params are
/// re-hashed on the next successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub m_cost_kib: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        // argon2 crate defaults (OWASP baseline)
        Self { m_cost_kib: 19_456, t_cost: 2, p_cost: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.session_ttl_minutes, 60);
        assert_eq!(cfg.max_failed_attempts, 5);
        assert_eq!(cfg.lockout_minutes, 15);
        assert_eq!(cfg.lockout_ms(), 900_000);
    }

    #[test]
    fn all_four_classes_are_mandatory() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate("S3gura!2024").is_ok());
        assert!(matches!(policy.validate("short1!"), Err(AuthError::WeakPassword { .. })));
        assert!(policy.validate("nouppercase1!").is_err());
        assert!(policy.validate("NOLOWERCASE1!").is_err());
        assert!(policy.validate("NoDigitsHere!").is_err());
        assert!(policy.validate("NoSymbols123").is_err());
    }
}
