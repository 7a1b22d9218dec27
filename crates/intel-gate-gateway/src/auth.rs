// crates/intel-gate-gateway/src/auth.rs
// ============================================================================
// Module: Gateway Authn/Authz
// Description: Tier-based API key authorization for share requests.
// Purpose: Enforce fail-closed key checks before any artifact access.
// Dependencies: intel-gate-config, serde, subtle
// ============================================================================

//! ## Overview
//! The gateway recognizes three tiers. Public routes need no credentials.
//! Partner routes require `X-API-Key` to match the key registered for the
//! partner named in the path. Internal routes require `X-Internal-Key` to
//! match one of the registered internal keys. Every failure maps to the same
//! unauthenticated error so responses never reveal whether a partner or an
//! artifact exists. Key comparisons run in constant time and audit events
//! carry key fingerprints, never key material.

// ============================================================================
// SECTION: Imports
// ============================================================================

use intel_gate_config::ApiKeyRegistry;
use serde::Serialize;
use thiserror::Error;

use crate::security::constant_time_eq_str;
use crate::security::key_fingerprint;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted length of a key header value.
const MAX_KEY_HEADER_BYTES: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway authentication errors. Every variant maps to HTTP 401.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, or incorrect credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Authenticated caller context for audit events.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Tier label of the satisfied check.
    pub tier: &'static str,
    /// SHA-256 fingerprint of the presented key, when one was required.
    pub key_fingerprint: Option<String>,
}

// ============================================================================
// SECTION: Authorizer
// ============================================================================

/// Key-based authorizer over the configured key registry.
pub struct ShareAuthz {
    /// Registered partner and internal keys.
    registry: ApiKeyRegistry,
}

impl ShareAuthz {
    /// Creates an authorizer over the given registry.
    #[must_use]
    pub const fn new(registry: ApiKeyRegistry) -> Self {
        Self {
            registry,
        }
    }

    /// Authorizes a public-tier request. Always succeeds.
    #[must_use]
    pub const fn authorize_public(&self) -> AuthContext {
        AuthContext {
            tier: "public",
            key_fingerprint: None,
        }
    }

    /// Authorizes a partner-tier request against the partner's registered key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when the header is missing or
    /// wrong, or when no key is registered for the partner. The error never
    /// distinguishes those cases.
    pub fn authorize_partner(
        &self,
        partner: &str,
        presented: Option<&str>,
    ) -> Result<AuthContext, AuthError> {
        let presented = validate_presented_key(presented)?;
        let registered = self
            .registry
            .partner_key(partner)
            .ok_or_else(|| AuthError::Unauthenticated("invalid api key".to_string()))?;
        if !constant_time_eq_str(presented, registered) {
            return Err(AuthError::Unauthenticated("invalid api key".to_string()));
        }
        Ok(AuthContext {
            tier: "partner",
            key_fingerprint: Some(key_fingerprint(presented)),
        })
    }

    /// Authorizes an internal-tier request against the internal key set.
    ///
    /// Every registered key is compared so timing does not reveal which
    /// position matched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when the header is missing or
    /// matches no registered internal key.
    pub fn authorize_internal(&self, presented: Option<&str>) -> Result<AuthContext, AuthError> {
        let presented = validate_presented_key(presented)?;
        let mut matched = false;
        for registered in self.registry.internal_keys() {
            matched |= constant_time_eq_str(presented, registered);
        }
        if !matched {
            return Err(AuthError::Unauthenticated("invalid internal key".to_string()));
        }
        Ok(AuthContext {
            tier: "internal",
            key_fingerprint: Some(key_fingerprint(presented)),
        })
    }
}

/// Rejects absent, empty, or oversized key headers.
fn validate_presented_key(presented: Option<&str>) -> Result<&str, AuthError> {
    let presented =
        presented.ok_or_else(|| AuthError::Unauthenticated("missing key header".to_string()))?;
    if presented.is_empty() || presented.len() > MAX_KEY_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("invalid api key".to_string()));
    }
    Ok(presented)
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Share request audit event payload.
#[derive(Debug, Serialize)]
pub struct GatewayAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Request path.
    path: String,
    /// Caller IP address, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    peer_ip: Option<String>,
    /// Tier label of the route.
    tier: &'static str,
    /// Presented key fingerprint (sha256), allow events only.
    #[serde(skip_serializing_if = "Option::is_none")]
    key_fingerprint: Option<String>,
    /// Response status code.
    status: u16,
    /// Failure reason, deny events only.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl GatewayAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(path: &str, peer_ip: Option<String>, auth: &AuthContext, status: u16) -> Self {
        Self {
            event: "share_request",
            decision: "allow",
            path: path.to_string(),
            peer_ip,
            tier: auth.tier,
            key_fingerprint: auth.key_fingerprint.clone(),
            status,
            reason: None,
        }
    }

    /// Builds a deny event. Carries no hint of artifact existence.
    #[must_use]
    pub fn denied(path: &str, peer_ip: Option<String>, tier: &'static str, reason: &str) -> Self {
        Self {
            event: "share_request",
            decision: "deny",
            path: path.to_string(),
            peer_ip,
            tier,
            key_fingerprint: None,
            status: 401,
            reason: Some(reason.to_string()),
        }
    }
}

/// Sink for gateway audit events.
pub trait GatewayAuditSink: Send + Sync {
    /// Records one audit event.
    fn record(&self, event: &GatewayAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrGatewayAuditSink;

impl GatewayAuditSink for StderrGatewayAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is the audit transport.")]
    fn record(&self, event: &GatewayAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopGatewayAuditSink;

impl GatewayAuditSink for NoopGatewayAuditSink {
    fn record(&self, _event: &GatewayAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
