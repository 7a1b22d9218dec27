// crates/intel-gate-gateway/src/lib.rs
// ============================================================================
// Module: Intel Gate Gateway Library
// Description: Key-gated HTTP serving of published share artifacts.
// Purpose: Expose the share tree with strict tier-based authorization.
// Dependencies: axum, intel-gate-config, intel-gate-export, subtle
// ============================================================================

//! ## Overview
//! `intel-gate-gateway` is the read side of the share tree: an axum server
//! with three trust tiers. Authorization always runs before any filesystem
//! access and failures never reveal whether a partner or artifact exists.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod security;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthError;
pub use auth::GatewayAuditEvent;
pub use auth::GatewayAuditSink;
pub use auth::NoopGatewayAuditSink;
pub use auth::ShareAuthz;
pub use auth::StderrGatewayAuditSink;
pub use server::GatewayError;
pub use server::GatewayState;
pub use server::INTERNAL_KEY_HEADER;
pub use server::PARTNER_KEY_HEADER;
pub use server::serve;
pub use server::share_router;
