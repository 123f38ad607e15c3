use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::model::{ExchangeId, ParticipantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    AssignmentsGenerated {
        exchange_id: ExchangeId,
        auto_detect: bool,
    },
    ExchangeEmail {
        exchange_id: ExchangeId,
        recipients: usize,
    },
    ResendEmails {
        exchange_id: ExchangeId,
        givers: Vec<ParticipantId>,
        recipients: usize,
    },
}

/// Fire and forget, recording must never fail the operation that triggered it.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

impl<T: AuditSink> AuditSink for Arc<T> {
    fn record(&self, event: AuditEvent) {
        (**self).record(event);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "audit", event = %json, "audit event"),
            Err(error) => warn!(target: "audit", ?event, %error, "failed to serialize audit event"),
        }
    }
}
