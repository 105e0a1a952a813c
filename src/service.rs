//! Auth orchestrator: the state machine tying users, sessions, the
//! hasher, the OTP provider and the record stores together.
//!
//! Accounts derive `Unlocked`/`Locked` from the failure counter and
//! `locked_until`; MFA moves Disabled → PendingVerification → Enabled;
//! sessions move Active → Expired (derived) or Active → Revoked
//! (explicit, terminal). Every operation emits one audit fact.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::hasher::Hasher;
use crate::otp::OtpProvider;
use crate::permission::Permission;
use crate::rbac::{self, RoleCatalog};
use crate::role;
use crate::session::{hash_client_ip, PublicSession, Session};
use crate::store::RecordStore;
use crate::user::{normalize_email, validate_email, PublicUser, User};

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub roles: Vec<String>,
    pub extra_permissions: Vec<Permission>,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub otp_code: Option<String>,
    pub ttl_minutes: Option<i64>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            otp_code: None,
            ttl_minutes: None,
            ip: None,
            user_agent: None,
        }
    }

    pub fn otp_code(mut self, code: impl Into<String>) -> Self {
        self.otp_code = Some(code.into());
        self
    }

    pub fn ttl_minutes(mut self, minutes: i64) -> Self {
        self.ttl_minutes = Some(minutes);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub session: PublicSession,
}

#[derive(Debug, Clone)]
pub struct MfaSetup {
    pub secret: String,
    pub provisioning_uri: String,
}

#[derive(Debug, Clone)]
pub struct MfaVerify {
    pub verified: bool,
    /// Present only on the verification that enabled MFA; shown once.
    pub recovery_codes: Option<Vec<String>>,
}

pub struct AuthService {
    users: Arc<dyn RecordStore<User>>,
    sessions: Arc<dyn RecordStore<Session>>,
    hasher: Arc<dyn Hasher>,
    otp: Arc<dyn OtpProvider>,
    audit: Arc<dyn AuditSink>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn RecordStore<User>>,
        sessions: Arc<dyn RecordStore<Session>>,
        hasher: Arc<dyn Hasher>,
        otp: Arc<dyn OtpProvider>,
        audit: Arc<dyn AuditSink>,
        config: AuthConfig,
    ) -> Self {
        Self { users, sessions, hasher, otp, audit, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ---- registration ----

    pub async fn register(&self, req: RegisterRequest) -> AuthResult<PublicUser> {
        let email = req.email.clone();
        let res = self.register_inner(req).await;
        match &res {
            Ok(view) => self
                .audit
                .record(AuditEvent::success("create", "user").actor(email.as_str()).target(view.id.as_str())),
            Err(e) => self.audit.record(AuditEvent::fail("create", "user", e.kind()).actor(email.as_str())),
        }
        res
    }

    async fn register_inner(&self, req: RegisterRequest) -> AuthResult<PublicUser> {
        let email = validate_email(&req.email)?;
        self.config.password_policy.validate(&req.password)?;
        if self.find_user(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        let hash = self.hasher.hash(&req.password)?;
        let mut roles: Vec<String> = Vec::new();
        for name in req.roles {
            if !roles.contains(&name) {
                roles.push(name);
            }
        }
        let user = User::new(
            Uuid::new_v4().to_string(),
            email,
            hash,
            roles,
            role::normalize(req.extra_permissions),
            now_ms(),
        );
        // the store's unique key catches a registration racing this one
        self.users.append(user.clone()).await.map_err(|e| match e {
            crate::store::StoreError::DuplicateRecord { .. } => AuthError::EmailTaken,
            other => other.into(),
        })?;
        info!(target: "keyward::auth", "register user={} email={}", user.id, user.email);
        Ok(self.public_user(&user))
    }

    // ---- login ----

    pub async fn login(&self, req: LoginRequest) -> AuthResult<LoginResponse> {
        let email = req.email.clone();
        let res = self.login_inner(&req).await;
        match &res {
            Ok(resp) => self.audit.record(
                AuditEvent::success("login", "auth")
                    .actor(email.as_str())
                    .target(resp.user.id.as_str())
                    .session(resp.session.id.as_str()),
            ),
            Err(e) => self.audit.record(AuditEvent::fail("login", "auth", e.kind()).actor(email.as_str())),
        }
        res
    }

    async fn login_inner(&self, req: &LoginRequest) -> AuthResult<LoginResponse> {
        let email = normalize_email(&req.email);
        let now = now_ms();
        let Some(mut user) = self.find_user(&email).await? else {
            return Err(AuthError::UserNotFound);
        };

        // lockout short-circuits: no credential check while locked
        if user.is_locked(now) {
            return Err(AuthError::AccountLocked { until: user.locked_until });
        }

        if !self.hasher.verify(&req.password, &user.password_hash) {
            return self.fail_attempt(user, now, AuthError::InvalidCredentials).await;
        }

        // outdated cost factor: re-hash now, applied at the success write
        let rehashed = if self.hasher.needs_rehash(&user.password_hash) {
            match self.hasher.hash(&req.password) {
                Ok(h) => Some(h),
                Err(e) => {
                    warn!(target: "keyward::auth", "rehash failed user={}: {e}", user.id);
                    None
                }
            }
        } else {
            None
        };

        if user.mfa_enabled {
            let Some(code) = req.otp_code.as_deref() else {
                return Err(AuthError::MfaRequired);
            };
            let secret = user
                .mfa_secret
                .clone()
                .ok_or_else(|| AuthError::Internal("mfa enabled without a secret".into()))?;
            if !self.otp.verify(code, &secret) {
                return self.fail_attempt(user, now, AuthError::MfaInvalid).await;
            }
        }

        user.clear_failures(now);
        if let Some(h) = rehashed {
            user.password_hash = h;
        }
        self.users.update_by_id(user.clone()).await?;

        let ttl = req.ttl_minutes.unwrap_or(self.config.session_ttl_minutes);
        let session = Session::new(
            user.id.clone(),
            ttl,
            now,
            req.ip.as_deref().map(hash_client_ip),
            req.user_agent.clone(),
        );
        self.sessions.append(session.clone()).await?;
        info!(target: "keyward::auth", "login ok user={} sid={} ttl_min={}", user.id, session.id, ttl);

        Ok(LoginResponse {
            user: self.public_user(&user),
            session: PublicSession::from_session(&session, now),
        })
    }

    /// Shared failed-attempt bump for bad passwords and bad MFA codes. The
    /// counter update is persisted best-effort; if that write fails the
    /// original authentication error still wins.
    async fn fail_attempt<T>(&self, mut user: User, now: i64, err: AuthError) -> AuthResult<T> {
        user.register_failure(self.config.max_failed_attempts, self.config.lockout_ms(), now);
        if user.is_locked(now) {
            info!(target: "keyward::auth", "lockout user={} until={}", user.id, user.locked_until);
        }
        if let Err(e) = self.users.update_by_id(user.clone()).await {
            warn!(target: "keyward::auth", "failed-attempt persist failed user={}: {e}", user.id);
        }
        Err(err)
    }

    // ---- logout ----

    /// Not idempotent by design: revoking an already-inactive session is a
    /// user-visible error, distinct from an unknown session id.
    pub async fn logout(&self, session_id: &str) -> AuthResult<()> {
        let res = self.logout_inner(session_id).await;
        match &res {
            Ok(()) => self.audit.record(AuditEvent::success("logout", "auth").session(session_id)),
            Err(e) => {
                self.audit.record(AuditEvent::fail("logout", "auth", e.kind()).session(session_id))
            }
        }
        res
    }

    async fn logout_inner(&self, session_id: &str) -> AuthResult<()> {
        let now = now_ms();
        let Some(mut session) = self.sessions.get_by_id(session_id).await? else {
            return Err(AuthError::SessionNotFound);
        };
        if !session.is_active(now) {
            return Err(AuthError::SessionInactive);
        }
        session.revoke(now);
        self.sessions.update_by_id(session).await?;
        info!(target: "keyward::auth", "logout sid={}", session_id);
        Ok(())
    }

    // ---- MFA ----

    /// Generate and store a fresh secret, overwriting any prior pending
    /// one; the account is back in PendingVerification until
    /// [`mfa_verify`](Self::mfa_verify) succeeds.
    pub async fn mfa_setup(&self, user_id: &str, issuer: &str) -> AuthResult<MfaSetup> {
        let res = self.mfa_setup_inner(user_id, issuer).await;
        match &res {
            Ok(_) => self.audit.record(AuditEvent::success("setup", "mfa").target(user_id)),
            Err(e) => self.audit.record(AuditEvent::fail("setup", "mfa", e.kind()).target(user_id)),
        }
        res
    }

    async fn mfa_setup_inner(&self, user_id: &str, issuer: &str) -> AuthResult<MfaSetup> {
        let Some(mut user) = self.users.get_by_id(user_id).await? else {
            return Err(AuthError::UserNotFound);
        };
        let secret = self.otp.generate_secret();
        let uri = self.otp.provisioning_uri(&user.email, issuer, &secret)?;
        user.mfa_secret = Some(secret.clone());
        user.mfa_enabled = false;
        user.recovery_codes = None;
        user.touch(now_ms());
        self.users.update_by_id(user).await?;
        Ok(MfaSetup { secret, provisioning_uri: uri })
    }

    /// A wrong code is a normal `verified: false` outcome, not an error;
    /// structural failures (unknown user, setup never started) are errors.
    pub async fn mfa_verify(&self, user_id: &str, code: &str) -> AuthResult<MfaVerify> {
        let res = self.mfa_verify_inner(user_id, code).await;
        match &res {
            Ok(v) if v.verified => {
                self.audit.record(AuditEvent::success("verify", "mfa").target(user_id))
            }
            Ok(_) => self.audit.record(AuditEvent::fail("verify", "mfa", "invalid_code").target(user_id)),
            Err(e) => self.audit.record(AuditEvent::fail("verify", "mfa", e.kind()).target(user_id)),
        }
        res
    }

    async fn mfa_verify_inner(&self, user_id: &str, code: &str) -> AuthResult<MfaVerify> {
        let Some(mut user) = self.users.get_by_id(user_id).await? else {
            return Err(AuthError::UserNotFound);
        };
        let secret = user.mfa_secret.clone().ok_or(AuthError::MfaNotEnabled)?;
        if !self.otp.verify(code, &secret) {
            return Ok(MfaVerify { verified: false, recovery_codes: None });
        }
        user.mfa_enabled = true;
        let codes = gen_recovery_codes();
        user.recovery_codes = Some(codes.clone());
        user.touch(now_ms());
        self.users.update_by_id(user).await?;
        info!(target: "keyward::auth", "mfa enabled user={}", user_id);
        Ok(MfaVerify { verified: true, recovery_codes: Some(codes) })
    }

    // ---- session gate ----

    /// Resolve a session, refresh its activity timestamp and assert the
    /// required permissions against the bearer's effective set.
    pub async fn authorize(
        &self,
        session_id: &str,
        required: &[Permission],
        catalog: Option<&RoleCatalog>,
    ) -> AuthResult<PublicUser> {
        let res = self.authorize_inner(session_id, required, catalog).await;
        match &res {
            Ok(view) => self.audit.record(
                AuditEvent::success("authorize", "session")
                    .actor(view.email.as_str())
                    .session(session_id),
            ),
            Err(e) => self
                .audit
                .record(AuditEvent::fail("authorize", "session", e.kind()).session(session_id)),
        }
        res
    }

    async fn authorize_inner(
        &self,
        session_id: &str,
        required: &[Permission],
        catalog: Option<&RoleCatalog>,
    ) -> AuthResult<PublicUser> {
        let now = now_ms();
        let Some(mut session) = self.sessions.get_by_id(session_id).await? else {
            return Err(AuthError::SessionNotFound);
        };
        if !session.is_active(now) {
            return Err(AuthError::SessionInactive);
        }
        session.touch(now);
        // activity tracking is best-effort
        if let Err(e) = self.sessions.update_by_id(session.clone()).await {
            warn!(target: "keyward::auth", "activity persist failed sid={}: {e}", session.id);
        }
        let Some(user) = self.users.get_by_id(&session.user_id).await? else {
            return Err(AuthError::UserNotFound);
        };
        rbac::assert_all(&user, required, catalog)?;
        Ok(PublicUser::from_user(&user, rbac::effective_permissions(&user, catalog)))
    }

    // ---- session bookkeeping ----

    /// Revoke every active session of a user; already-inactive sessions
    /// are skipped. Returns the number revoked.
    pub async fn invalidate_sessions(&self, user_id: &str) -> AuthResult<usize> {
        let now = now_ms();
        let mut count = 0usize;
        for mut session in self.sessions.list_all().await? {
            if session.user_id == user_id && session.is_active(now) {
                session.revoke(now);
                self.sessions.update_by_id(session).await?;
                count += 1;
            }
        }
        self.audit.record(
            AuditEvent::success("invalidate", "session")
                .target(user_id)
                .meta(serde_json::json!({ "revoked": count })),
        );
        info!(target: "keyward::auth", "session.invalidate user={} count={}", user_id, count);
        Ok(count)
    }

    /// Sessions of a user, newest first.
    pub async fn sessions_for_user(&self, user_id: &str) -> AuthResult<Vec<PublicSession>> {
        let now = now_ms();
        let mut sessions: Vec<Session> = self
            .sessions
            .list_all()
            .await?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.issued_at));
        Ok(sessions.iter().map(|s| PublicSession::from_session(s, now)).collect())
    }

    // ---- lookups ----

    pub async fn get_user(&self, user_id: &str) -> AuthResult<PublicUser> {
        match self.users.get_by_id(user_id).await? {
            Some(user) => Ok(self.public_user(&user)),
            None => Err(AuthError::UserNotFound),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<PublicUser>> {
        let normalized = normalize_email(email);
        Ok(self.find_user(&normalized).await?.map(|u| self.public_user(&u)))
    }

    async fn find_user(&self, normalized_email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .list_all()
            .await?
            .into_iter()
            .find(|u| u.email == normalized_email))
    }

    /// Public views compute effective permissions against the built-in
    /// presets; `authorize` is the call that takes an explicit catalog.
    fn public_user(&self, user: &User) -> PublicUser {
        PublicUser::from_user(user, rbac::effective_permissions(user, None))
    }
}

fn gen_recovery_codes() -> Vec<String> {
    (0..8)
        .map(|_| {
            let mut buf = [0u8; 5];
            let _ = getrandom::getrandom(&mut buf);
            buf.iter().map(|b| format!("{b:02x}")).collect::<String>()
        })
        .collect()
}
