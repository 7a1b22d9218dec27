// crates/intel-gate-config/src/policy.rs
// ============================================================================
// Module: Audience Policy Store
// Description: Compilation of raw audience entries into validated profiles.
// Purpose: Reject unknown tiers and malformed policies before any export runs.
// Dependencies: intel-gate-core, thiserror
// ============================================================================

//! ## Overview
//! The policy store compiles raw `[[audiences]]` config entries into
//! immutable [`AudienceProfile`] values. Compilation is strict: unknown TLP
//! levels, unknown auth tiers, negative caps, out-of-range confidence, bad
//! identifiers, and missing key material all fail closed. Audience ids double
//! as share tree path segments, so their character set is restricted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use intel_gate_core::AudienceId;
use intel_gate_core::AudienceProfile;
use intel_gate_core::AuthTier;
use intel_gate_core::TlpLevel;
use thiserror::Error;

use crate::config::AudienceConfig;
use crate::config::ConfigError;
use crate::config::IntelGateConfig;
use crate::config::MAX_AUDIENCE_LABELS;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of an audience identifier.
const MAX_AUDIENCE_ID_LENGTH: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy lookup errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No audience is registered under the identifier.
    #[error("unknown audience: {0}")]
    NotFound(String),
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Immutable set of compiled audience profiles.
///
/// A store is built once from validated configuration. Policy changes take
/// effect by rebuilding the store, never by mutating profiles in place.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    /// Compiled profiles keyed by audience identifier.
    profiles: BTreeMap<AudienceId, AudienceProfile>,
}

impl PolicyStore {
    /// Compiles the audience entries of a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any audience entry is invalid or when an
    /// audience's auth tier has no matching key material.
    pub fn from_config(config: &IntelGateConfig) -> Result<Self, ConfigError> {
        let mut profiles = BTreeMap::new();
        let mut public_count = 0usize;
        let mut internal_count = 0usize;
        for entry in &config.audiences {
            let profile = compile_audience(entry)?;
            match profile.auth_tier {
                AuthTier::PartnerKey => {
                    if !config.keys.partner_keys.contains_key(entry.id.as_str()) {
                        return Err(ConfigError::Invalid(format!(
                            "audience {} requires a partner key in keys.partner_keys",
                            entry.id
                        )));
                    }
                }
                AuthTier::InternalKey => {
                    if config.keys.internal_keys.is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "audience {} requires at least one internal key",
                            entry.id
                        )));
                    }
                    internal_count += 1;
                }
                AuthTier::None => {
                    public_count += 1;
                }
            }
            // The public and internal tiers each own one fixed artifact
            // directory in the share tree.
            if public_count > 1 {
                return Err(ConfigError::Invalid(
                    "at most one audience may use auth_tier none".to_string(),
                ));
            }
            if internal_count > 1 {
                return Err(ConfigError::Invalid(
                    "at most one audience may use auth_tier internal_key".to_string(),
                ));
            }
            if profiles.insert(profile.id.clone(), profile).is_some() {
                return Err(ConfigError::Invalid(format!("duplicate audience id: {}", entry.id)));
            }
        }
        Ok(Self {
            profiles,
        })
    }

    /// Returns the profile for an audience.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NotFound`] when the audience is unknown.
    pub fn get(&self, id: &AudienceId) -> Result<&AudienceProfile, PolicyError> {
        self.profiles.get(id).ok_or_else(|| PolicyError::NotFound(id.to_string()))
    }

    /// Returns all profiles in ascending id order.
    pub fn list_audiences(&self) -> impl Iterator<Item = &AudienceProfile> {
        self.profiles.values()
    }

    /// Returns the number of compiled audiences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true when no audiences are compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

// ============================================================================
// SECTION: Key Registry
// ============================================================================

/// Validated API key material for gated tiers.
#[derive(Debug, Clone)]
pub struct ApiKeyRegistry {
    /// Partner keys keyed by audience identifier.
    partner_keys: BTreeMap<String, String>,
    /// Accepted internal keys.
    internal_keys: Vec<String>,
}

impl ApiKeyRegistry {
    /// Builds the registry from a validated configuration.
    #[must_use]
    pub fn from_config(config: &IntelGateConfig) -> Self {
        Self {
            partner_keys: config.keys.partner_keys.clone(),
            internal_keys: config.keys.internal_keys.clone(),
        }
    }

    /// Returns the partner key registered for an audience, if any.
    #[must_use]
    pub fn partner_key(&self, audience: &str) -> Option<&str> {
        self.partner_keys.get(audience).map(String::as_str)
    }

    /// Returns the accepted internal keys.
    #[must_use]
    pub fn internal_keys(&self) -> &[String] {
        &self.internal_keys
    }
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiles one raw audience entry into a validated profile.
fn compile_audience(entry: &AudienceConfig) -> Result<AudienceProfile, ConfigError> {
    validate_audience_id(&entry.id)?;
    let tlp = TlpLevel::parse(&entry.tlp).ok_or_else(|| {
        ConfigError::Invalid(format!("audience {}: unknown tlp level: {}", entry.id, entry.tlp))
    })?;
    let auth_tier = AuthTier::parse(&entry.auth_tier).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "audience {}: unknown auth tier: {}",
            entry.id, entry.auth_tier
        ))
    })?;
    let max_reports = compile_cap(&entry.id, "max_reports", entry.max_reports)?;
    let max_observables = compile_cap(&entry.id, "max_observables", entry.max_observables)?;
    let min_confidence = match entry.min_confidence {
        None => None,
        Some(value @ 0..=100) => Some(u8::try_from(value).map_err(|_| {
            ConfigError::Invalid(format!("audience {}: min_confidence out of range", entry.id))
        })?),
        Some(_) => {
            return Err(ConfigError::Invalid(format!(
                "audience {}: min_confidence must be between 0 and 100",
                entry.id
            )));
        }
    };
    if entry.allowed_labels.len() > MAX_AUDIENCE_LABELS {
        return Err(ConfigError::Invalid(format!(
            "audience {}: too many allowed_labels",
            entry.id
        )));
    }
    for label in &entry.allowed_labels {
        if label.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "audience {}: allowed_labels entries must be non-empty",
                entry.id
            )));
        }
    }
    Ok(AudienceProfile {
        id: AudienceId::new(entry.id.as_str()),
        tlp,
        auth_tier,
        include_reports: entry.include_reports,
        include_high_confidence_iocs: entry.include_high_confidence_iocs,
        max_reports,
        max_observables,
        allowed_labels: entry.allowed_labels.iter().cloned().collect(),
        min_confidence,
        sanitize: entry.sanitize,
    })
}

/// Compiles a raw cap value, rejecting negatives.
fn compile_cap(
    audience: &str,
    field: &str,
    value: Option<i64>,
) -> Result<Option<usize>, ConfigError> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let cap = usize::try_from(raw).map_err(|_| {
                ConfigError::Invalid(format!("audience {audience}: {field} must be non-negative"))
            })?;
            Ok(Some(cap))
        }
    }
}

/// Validates the audience identifier character set.
///
/// Audience ids appear verbatim as share tree directory names and URL path
/// segments, so only lowercase alphanumerics, hyphen, and underscore pass.
fn validate_audience_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Invalid("audience id must be non-empty".to_string()));
    }
    if id.len() > MAX_AUDIENCE_ID_LENGTH {
        return Err(ConfigError::Invalid(format!("audience id too long: {id}")));
    }
    if !id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Err(ConfigError::Invalid(format!(
            "audience id must match [a-z0-9_-]: {id}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
