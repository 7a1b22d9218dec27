// crates/intel-gate-core/src/audience.rs
// ============================================================================
// Module: Audience Profiles
// Description: Per-tier sharing policy values applied during bundle assembly.
// Purpose: Represent validated, immutable audience policies.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An audience is a named sharing tier or partner with its own confidentiality
//! policy and authorization requirement. Profiles are constructed once by the
//! policy store and never mutated; policy reload constructs a fresh store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::AudienceId;
use crate::tlp::TlpLevel;

// ============================================================================
// SECTION: Authorization Tiers
// ============================================================================

/// Authorization requirement for an audience's published artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthTier {
    /// No authentication; artifacts are public.
    None,
    /// Partner API key presented via `X-API-Key`.
    PartnerKey,
    /// Internal key presented via `X-Internal-Key`.
    InternalKey,
}

impl AuthTier {
    /// Parses an auth tier from its lowercase string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "partner_key" => Some(Self::PartnerKey),
            "internal_key" => Some(Self::InternalKey),
            _ => None,
        }
    }

    /// Returns the lowercase string form of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PartnerKey => "partner_key",
            Self::InternalKey => "internal_key",
        }
    }
}

// ============================================================================
// SECTION: Audience Profiles
// ============================================================================

/// Validated sharing policy for one audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceProfile {
    /// Audience identifier.
    pub id: AudienceId,
    /// TLP level applied to every bundle published for this audience.
    pub tlp: TlpLevel,
    /// Authorization requirement for serving this audience's artifacts.
    pub auth_tier: AuthTier,
    /// Include report objects in published artifacts.
    pub include_reports: bool,
    /// Publish the high-confidence IOC artifact for this audience.
    pub include_high_confidence_iocs: bool,
    /// Cap on report objects per bundle; `None` is unbounded.
    pub max_reports: Option<usize>,
    /// Cap on observable objects per bundle; `None` is unbounded.
    pub max_observables: Option<usize>,
    /// Label filter; an empty set disables label filtering.
    pub allowed_labels: BTreeSet<String>,
    /// Minimum confidence for inclusion; `None` disables the filter.
    pub min_confidence: Option<u8>,
    /// Strip restricted fields from every published object.
    pub sanitize: bool,
}
