// crates/intel-gate-config/src/lib.rs
// ============================================================================
// Module: Intel Gate Config Library
// Description: Canonical config model, validation, and policy compilation.
// Purpose: Single source of truth for intel-gate.toml semantics.
// Dependencies: intel-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `intel-gate-config` defines the canonical configuration model for the
//! dissemination pipeline. It provides strict, fail-closed validation, the
//! compiled audience policy store, and the API key registry consumed by the
//! serving gateway. Config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;
pub mod policy;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
pub use policy::*;
