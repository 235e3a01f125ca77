use reqflow_core::audit::{AuditEvent, AuditOutcome, AuditSink};
use tracing::{info, warn};

/// Writes audit events as structured log lines on the `audit` target.
#[derive(Clone, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();
        let requisition_id =
            event.requisition_id.as_ref().map(|id| id.0.as_str()).unwrap_or("none");
        let category = format!("{:?}", event.category).to_lowercase();

        match event.outcome {
            AuditOutcome::Success => info!(
                target: "audit",
                event_name = %event.event_type,
                event_id = %event.event_id,
                correlation_id = %event.correlation_id,
                requisition_id,
                actor = %event.actor,
                category = %category,
                outcome = "success",
                metadata = %metadata,
                occurred_at = %event.occurred_at.to_rfc3339(),
                "audit event"
            ),
            AuditOutcome::Rejected | AuditOutcome::Failed => warn!(
                target: "audit",
                event_name = %event.event_type,
                event_id = %event.event_id,
                correlation_id = %event.correlation_id,
                requisition_id,
                actor = %event.actor,
                category = %category,
                outcome = if event.outcome == AuditOutcome::Failed { "failed" } else { "rejected" },
                metadata = %metadata,
                occurred_at = %event.occurred_at.to_rfc3339(),
                "audit event"
            ),
        }
    }
}
