//! Keyward: a local authentication and authorization engine.
//! Users, roles, sessions and TOTP MFA over flat append-only record
//! files; the core talks to storage, hashing and OTP generation through
//! collaborator traits so integrators can swap any of them out.

pub mod audit;
pub mod config;
pub mod error;
pub mod hasher;
pub mod otp;
pub mod permission;
pub mod rbac;
pub mod role;
pub mod service;
pub mod session;
pub mod store;
pub mod user;

pub use audit::{AuditEvent, AuditSink, AuditStatus, MemoryAuditSink, NoopAuditSink, TracingAuditSink};
pub use config::{AuthConfig, HashCost, PasswordPolicy};
pub use error::{AuthError, AuthResult};
pub use hasher::{Argon2Hasher, Hasher};
pub use otp::{OtpProvider, TotpProvider};
pub use permission::{covers_all, covers_any, Action, Permission, Resource};
pub use rbac::{assert_all, assert_any, effective_permissions, user_has_all, user_has_any, RoleCatalog};
pub use role::{build_role, merge_roles, normalize, preset_permissions, Role, RoleSpec};
pub use service::{AuthService, LoginRequest, LoginResponse, MfaSetup, MfaVerify, RegisterRequest};
pub use session::{PublicSession, Session};
pub use store::{JsonlStore, MemoryStore, Record, RecordStore, StoreError};
pub use user::{normalize_email, validate_email, PublicUser, User};

// Test-only printing helper: expands to eprintln! during tests and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
