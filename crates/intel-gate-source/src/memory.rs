// crates/intel-gate-source/src/memory.rs
// ============================================================================
// Module: Static Source Client
// Description: In-memory source client for tests and offline operation.
// Purpose: Drive the export pipeline without an upstream platform.
// Dependencies: intel-gate-core
// ============================================================================

//! ## Overview
//! The static client serves pre-loaded object snapshots and can be toggled to
//! fail, which lets tests exercise the fetch-failure path of the orchestrator
//! without a network.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use intel_gate_core::IntelObject;
use time::OffsetDateTime;

use crate::client::SourceClient;
use crate::client::SourceError;

// ============================================================================
// SECTION: Client
// ============================================================================

/// In-memory source client with a failure toggle.
#[derive(Debug, Default)]
pub struct StaticSourceClient {
    /// Reports returned by `fetch_reports`.
    reports: Vec<IntelObject>,
    /// Observables returned by `fetch_observables`.
    observables: Vec<IntelObject>,
    /// Indicators returned by `fetch_indicators`.
    indicators: Vec<IntelObject>,
    /// When set, every fetch fails.
    fail: AtomicBool,
}

impl StaticSourceClient {
    /// Creates a client serving the given snapshots.
    #[must_use]
    pub const fn new(
        reports: Vec<IntelObject>,
        observables: Vec<IntelObject>,
        indicators: Vec<IntelObject>,
    ) -> Self {
        Self {
            reports,
            observables,
            indicators,
            fail: AtomicBool::new(false),
        }
    }

    /// Toggles the failure mode for subsequent fetches.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Returns a truncated copy of a snapshot, honoring the failure toggle.
    fn serve(&self, objects: &[IntelObject], limit: usize) -> Result<Vec<IntelObject>, SourceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Upstream("static source failing".to_string()));
        }
        Ok(objects.iter().take(limit).cloned().collect())
    }
}

impl SourceClient for StaticSourceClient {
    fn fetch_reports(
        &self,
        _since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError> {
        self.serve(&self.reports, limit)
    }

    fn fetch_observables(
        &self,
        _since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError> {
        self.serve(&self.observables, limit)
    }

    fn fetch_indicators(
        &self,
        _since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError> {
        self.serve(&self.indicators, limit)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
