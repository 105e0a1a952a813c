//! Typed error taxonomy for the auth engine.
//! Every failure carries a stable machine-readable kind so front ends can
//! branch on it without parsing messages.

use thiserror::Error;

use crate::permission::Permission;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email address: {email}")]
    InvalidEmail { email: String },
    #[error("password too weak: {reason}")]
    WeakPassword { reason: String },
    #[error("email is already registered")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is locked until {until}")]
    AccountLocked { until: i64 },
    #[error("one-time code required")]
    MfaRequired,
    #[error("invalid one-time code")]
    MfaInvalid,
    #[error("session not found")]
    SessionNotFound,
    #[error("session is no longer active")]
    SessionInactive,
    #[error("MFA setup has not been started")]
    MfaNotEnabled,
    #[error("permission denied; missing: {}", format_permissions(.missing))]
    PermissionDenied { missing: Vec<Permission> },
    #[error("invalid permission token: {token}")]
    InvalidPermission { token: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_permissions(perms: &[Permission]) -> String {
    perms.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}

impl AuthError {
    /// Stable tag for logging, audit reasons and front-end exit codes.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidEmail { .. } => "invalid_email",
            AuthError::WeakPassword { .. } => "weak_password",
            AuthError::EmailTaken => "email_taken",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountLocked { .. } => "account_locked",
            AuthError::MfaRequired => "mfa_required",
            AuthError::MfaInvalid => "mfa_invalid",
            AuthError::SessionNotFound => "session_not_found",
            AuthError::SessionInactive => "session_inactive",
            AuthError::MfaNotEnabled => "mfa_not_enabled",
            AuthError::PermissionDenied { .. } => "permission_denied",
            AuthError::InvalidPermission { .. } => "invalid_permission",
            AuthError::Store(_) => "store_error",
            AuthError::Internal(_) => "internal",
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
