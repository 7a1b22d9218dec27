// crates/intel-gate-source/src/lib.rs
// ============================================================================
// Module: Intel Gate Source Library
// Description: Upstream intelligence platform clients.
// Purpose: Provide the fetch interface and its HTTP and in-memory backends.
// Dependencies: intel-gate-config, intel-gate-core, reqwest
// ============================================================================

//! ## Overview
//! `intel-gate-source` fetches intelligence objects from the upstream
//! platform. The [`SourceClient`] trait is the seam the export orchestrator
//! depends on; [`HttpSourceClient`] talks GraphQL to the real platform and
//! [`StaticSourceClient`] serves canned snapshots for tests and offline use.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod http;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::SourceClient;
pub use client::SourceError;
pub use http::HttpSourceClient;
pub use memory::StaticSourceClient;
