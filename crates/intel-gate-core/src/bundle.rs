// crates/intel-gate-core/src/bundle.rs
// ============================================================================
// Module: Bundle Builder
// Description: Policy-compliant STIX 2.1 bundle assembly.
// Purpose: Apply audience filters, caps, and sanitization in a fixed order.
// Dependencies: serde_json, sha2
// ============================================================================

//! ## Overview
//! The bundle builder turns a cycle's object snapshot into one STIX 2.1
//! bundle for one audience. Steps run in a fixed order: marking selection,
//! label filter, confidence filter, kind-specific caps (applied after
//! filtering, preserving recency order), sanitization, assembly, and id
//! assignment. Bundle ids are stable within a generation: they are derived
//! from the audience id and the generation timestamp.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use sha2::Digest;
use sha2::Sha256;

use crate::audience::AudienceProfile;
use crate::identifiers::ObjectId;
use crate::object::IntelObject;
use crate::object::ObjectKind;
use crate::sanitize::sanitize;
use crate::tlp::MarkingDefinition;

// ============================================================================
// SECTION: Bundle Types
// ============================================================================

/// Serialized STIX 2.1 bundle envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Bundle identifier in `bundle--uuid` form.
    pub id: String,
    /// Ordered STIX objects: exactly one marking-definition first.
    pub objects: Vec<Value>,
}

impl Bundle {
    /// Serializes the bundle into its STIX 2.1 envelope layout.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "type": "bundle",
            "spec_version": "2.1",
            "id": self.id,
            "objects": self.objects,
        })
    }

    /// Serializes the bundle to pretty-printed JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` when serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(&self.to_value())
    }
}

/// Object skipped during bundle construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedObject {
    /// Identifier of the skipped object.
    pub id: ObjectId,
    /// Human-readable skip reason.
    pub reason: String,
}

/// Outcome of one bundle construction.
#[derive(Debug, Clone)]
pub struct BundleOutcome {
    /// Assembled bundle.
    pub bundle: Bundle,
    /// Count of intelligence objects included (marking excluded).
    pub included: usize,
    /// Malformed objects skipped with reasons.
    pub skipped: Vec<SkippedObject>,
}

// ============================================================================
// SECTION: Bundle Builder
// ============================================================================

/// Assembles policy-compliant bundles for one audience at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleBuilder;

impl BundleBuilder {
    /// Builds a bundle from the audience profile and a snapshot of objects.
    ///
    /// `generated_at_millis` is the cycle generation timestamp; it seeds the
    /// stable bundle id so rebuilding the same generation yields the same id.
    #[must_use]
    pub fn build(
        profile: &AudienceProfile,
        objects: &[IntelObject],
        generated_at_millis: i64,
    ) -> BundleOutcome {
        let marking = MarkingDefinition::for_level(profile.tlp);
        let filtered = filter_objects(profile, objects);
        let capped = apply_caps(profile, filtered);

        let mut stix_objects = Vec::with_capacity(capped.len() + 1);
        stix_objects.push(marking.to_stix());
        let mut skipped = Vec::new();
        let mut included = 0usize;
        for object in capped {
            if let Err(error) = object.validate() {
                skipped.push(SkippedObject {
                    id: object.id().clone(),
                    reason: error.to_string(),
                });
                continue;
            }
            let processed = sanitize(object, profile);
            stix_objects.push(processed.to_stix());
            included += 1;
        }

        BundleOutcome {
            bundle: Bundle {
                id: bundle_id(profile.id.as_str(), generated_at_millis),
                objects: stix_objects,
            },
            included,
            skipped,
        }
    }
}

/// Applies label and confidence filters, preserving input order.
fn filter_objects<'a>(profile: &AudienceProfile, objects: &'a [IntelObject]) -> Vec<&'a IntelObject> {
    objects
        .iter()
        .filter(|object| {
            if !profile.allowed_labels.is_empty()
                && object.labels().is_disjoint(&profile.allowed_labels)
            {
                return false;
            }
            if let Some(min) = profile.min_confidence
                && object.confidence() < min
            {
                return false;
            }
            true
        })
        .collect()
}

/// Truncates the filtered sequence per kind-specific caps.
fn apply_caps<'a>(
    profile: &AudienceProfile,
    objects: Vec<&'a IntelObject>,
) -> Vec<&'a IntelObject> {
    let mut reports = 0usize;
    let mut observables = 0usize;
    objects
        .into_iter()
        .filter(|object| match object.kind() {
            ObjectKind::Report => {
                reports += 1;
                profile.max_reports.is_none_or(|cap| reports <= cap)
            }
            ObjectKind::Observable => {
                observables += 1;
                profile.max_observables.is_none_or(|cap| observables <= cap)
            }
            ObjectKind::Indicator => true,
        })
        .collect()
}

/// Derives a stable `bundle--uuid` identifier for one audience generation.
#[must_use]
pub fn bundle_id(audience: &str, generated_at_millis: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(audience.as_bytes());
    hasher.update(b"|");
    hasher.update(generated_at_millis.to_be_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(16).map(|byte| format!("{byte:02x}")).collect();
    format!(
        "bundle--{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
