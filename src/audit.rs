//! Semantic audit facts emitted by the orchestrator after each operation.
//! Sinks are fire-and-forget; redaction, formatting and storage policy
//! live entirely on the sink side.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    pub resource: String,
    pub status: AuditStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn success(action: &str, resource: &str) -> Self {
        Self::new(action, resource, AuditStatus::Success)
    }

    pub fn fail(action: &str, resource: &str, reason: &str) -> Self {
        let mut ev = Self::new(action, resource, AuditStatus::Fail);
        ev.reason = Some(reason.to_string());
        ev
    }

    fn new(action: &str, resource: &str, status: AuditStatus) -> Self {
        Self {
            action: action.to_string(),
            resource: resource.to_string(),
            status,
            actor: None,
            target_id: None,
            session_id: None,
            reason: None,
            meta: None,
        }
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits each fact as a targeted tracing event.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let status = match event.status {
            AuditStatus::Success => "success",
            AuditStatus::Fail => "fail",
        };
        info!(
            target: "keyward::audit",
            "{}.{} status={} actor={} target={} session={} reason={}",
            event.resource,
            event.action,
            status,
            event.actor.as_deref().unwrap_or("-"),
            event.target_id.as_deref().unwrap_or("-"),
            event.session_id.as_deref().unwrap_or("-"),
            event.reason.as_deref().unwrap_or("-"),
        );
    }
}

/// Captures facts for assertions in tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<AuditEvent> {
        std::mem::take(&mut self.events.lock())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: AuditEvent) {}
}
