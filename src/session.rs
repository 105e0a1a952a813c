//! Sessions: bounded-lifetime authorization tokens issued at login.
//!
//! A session is a pure value type; liveness is derived from timestamps so
//! expiry never needs a write. Revocation is explicit and terminal.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// 256-bit random id, base64url without padding.
pub fn gen_session_id() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Sessions store only a hash of the client address, never the raw value.
pub fn hash_client_ip(ip: &str) -> String {
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(ip.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub last_used_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Session {
    pub fn new(
        user_id: String,
        ttl_minutes: i64,
        now_ms: i64,
        ip_hash: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            id: gen_session_id(),
            user_id,
            issued_at: now_ms,
            expires_at: now_ms + ttl_minutes * 60_000,
            last_used_at: now_ms,
            revoked_at: None,
            ip_hash,
            user_agent,
        }
    }

    /// Live for authorization purposes: not revoked and not past expiry.
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.revoked_at.is_none() && now_ms < self.expires_at
    }

    /// Revocation is set once and terminal; a second call is a no-op.
    pub fn revoke(&mut self, now_ms: i64) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(now_ms);
        }
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.last_used_at = now_ms;
    }
}

impl Record for Session {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Caller-facing session view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicSession {
    pub id: String,
    pub user_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub last_used_at: i64,
    pub active: bool,
}

impl PublicSession {
    pub fn from_session(session: &Session, now_ms: i64) -> Self {
        Self {
            id: session.id.clone(),
            user_id: session.user_id.clone(),
            issued_at: session.issued_at,
            expires_at: session.expires_at,
            last_used_at: session.last_used_at,
            active: session.is_active(now_ms),
        }
    }
}
