// crates/intel-gate-export/src/audit.rs
// ============================================================================
// Module: Export Audit Events
// Description: Structured audit events for export cycles.
// Purpose: Make cycle outcomes observable as JSON lines.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every notable export outcome is recorded through an audit sink: cycle
//! start, fetch failure, per-audience publish or failure, skipped objects,
//! manifest rewrite, whole-cycle failure, and overlapping ticks. Events
//! serialize as single JSON lines and never contain secrets or object
//! payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Export audit event payload.
#[derive(Debug, Serialize)]
pub struct ExportAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Audience identifier, when the event is audience-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<String>,
    /// Relative artifact path, when the event concerns one artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<String>,
    /// Object identifier, for skip events.
    #[serde(skip_serializing_if = "Option::is_none")]
    object_id: Option<String>,
    /// Count of objects included in a published artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    included: Option<usize>,
    /// Generation timestamp for cycle-scoped events.
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_at: Option<String>,
    /// Failure or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl ExportAuditEvent {
    /// Builds an event with all optional fields empty.
    const fn bare(event: &'static str) -> Self {
        Self {
            event,
            audience: None,
            artifact: None,
            object_id: None,
            included: None,
            generated_at: None,
            reason: None,
        }
    }

    /// A cycle began with the given generation timestamp.
    #[must_use]
    pub fn cycle_started(generated_at: &str) -> Self {
        Self {
            generated_at: Some(generated_at.to_string()),
            ..Self::bare("cycle_started")
        }
    }

    /// The upstream fetch failed and the cycle was aborted.
    #[must_use]
    pub fn fetch_failed(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Self::bare("fetch_failed")
        }
    }

    /// One artifact was published for an audience.
    #[must_use]
    pub fn audience_published(audience: &str, artifact: &str, included: usize) -> Self {
        Self {
            audience: Some(audience.to_string()),
            artifact: Some(artifact.to_string()),
            included: Some(included),
            ..Self::bare("audience_published")
        }
    }

    /// Publication failed for an audience; other audiences continue.
    #[must_use]
    pub fn audience_failed(audience: &str, reason: &str) -> Self {
        Self {
            audience: Some(audience.to_string()),
            reason: Some(reason.to_string()),
            ..Self::bare("audience_failed")
        }
    }

    /// A malformed object was dropped from an audience's artifact.
    #[must_use]
    pub fn object_skipped(audience: &str, object_id: &str, reason: &str) -> Self {
        Self {
            audience: Some(audience.to_string()),
            object_id: Some(object_id.to_string()),
            reason: Some(reason.to_string()),
            ..Self::bare("object_skipped")
        }
    }

    /// The cycle terminated with an error, such as a manifest write failure.
    #[must_use]
    pub fn cycle_failed(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Self::bare("cycle_failed")
        }
    }

    /// The share manifest was rewritten.
    #[must_use]
    pub fn manifest_written(generated_at: &str, included: usize) -> Self {
        Self {
            generated_at: Some(generated_at.to_string()),
            included: Some(included),
            ..Self::bare("manifest_written")
        }
    }

    /// A tick fired while the previous cycle was still running.
    #[must_use]
    pub const fn cycle_skipped_overlap() -> Self {
        Self::bare("cycle_skipped_overlap")
    }
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Audit sink for export events.
pub trait ExportAuditSink: Send + Sync {
    /// Record an export audit event.
    fn record(&self, event: &ExportAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrExportAuditSink;

impl ExportAuditSink for StderrExportAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is the audit transport.")]
    fn record(&self, event: &ExportAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopExportAuditSink;

impl ExportAuditSink for NoopExportAuditSink {
    fn record(&self, _event: &ExportAuditEvent) {}
}
