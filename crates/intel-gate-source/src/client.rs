// crates/intel-gate-source/src/client.rs
// ============================================================================
// Module: Source Client Trait
// Description: Upstream fetch interface consumed by the export orchestrator.
// Purpose: Decouple bundle production from the concrete platform client.
// Dependencies: intel-gate-core, thiserror, time
// ============================================================================

//! ## Overview
//! The export orchestrator fetches each object kind once per cycle through
//! this trait. Any fetch failure aborts the cycle: previously published
//! artifacts stay in place and the next cycle retries from scratch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use intel_gate_core::IntelObject;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Upstream fetch errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure or non-success upstream response.
    #[error("upstream source error: {0}")]
    Upstream(String),
    /// Upstream response could not be decoded.
    #[error("upstream decode error: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Read-only client for the upstream intelligence platform.
///
/// Implementations return objects created at or after `since`, newest first,
/// truncated to `limit` per kind.
pub trait SourceClient: Send + Sync {
    /// Fetches finished intelligence reports.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the upstream fetch fails.
    fn fetch_reports(
        &self,
        since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError>;

    /// Fetches raw observables.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the upstream fetch fails.
    fn fetch_observables(
        &self,
        since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError>;

    /// Fetches detection indicators.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the upstream fetch fails.
    fn fetch_indicators(
        &self,
        since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError>;
}
