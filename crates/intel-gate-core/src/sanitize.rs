// crates/intel-gate-core/src/sanitize.rs
// ============================================================================
// Module: Object Sanitizer
// Description: Removal of source-revealing fields before external release.
// Purpose: Enforce per-audience confidentiality on individual objects.
// Dependencies: intel-gate-core::{audience, object}
// ============================================================================

//! ## Overview
//! Sanitization is pure, non-mutating, and idempotent. Given a profile with
//! `sanitize = false` the object is returned unchanged; otherwise a copy is
//! returned with the restricted-field set removed: owner reference, external
//! references, connector/enrichment provenance, and any label carrying the
//! internal-only prefix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::audience::AudienceProfile;
use crate::object::IntelObject;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Labels carrying this prefix never leave the internal tier.
pub const INTERNAL_LABEL_PREFIX: &str = "internal:";

// ============================================================================
// SECTION: Sanitizer
// ============================================================================

/// Applies the profile's sanitization policy to one object.
///
/// Returns a clone of the input when `profile.sanitize` is false, otherwise a
/// copy with the restricted fields removed. Sanitizing twice yields the same
/// result as once.
#[must_use]
pub fn sanitize(object: &IntelObject, profile: &AudienceProfile) -> IntelObject {
    if !profile.sanitize {
        return object.clone();
    }
    strip_restricted(object)
}

/// Returns a copy of the object with all restricted fields removed.
#[must_use]
pub fn strip_restricted(object: &IntelObject) -> IntelObject {
    let mut stripped = object.clone();
    match &mut stripped {
        IntelObject::Report(report) => {
            report.owner_ref = None;
            report.external_references.clear();
            report.provenance = None;
            report.labels = public_labels(&report.labels);
        }
        IntelObject::Observable(observable) => {
            observable.owner_ref = None;
            observable.external_references.clear();
            observable.provenance = None;
            observable.labels = public_labels(&observable.labels);
        }
        IntelObject::Indicator(indicator) => {
            indicator.owner_ref = None;
            indicator.external_references.clear();
            indicator.provenance = None;
            indicator.labels = public_labels(&indicator.labels);
        }
    }
    stripped
}

/// Filters out labels carrying the internal-only prefix.
fn public_labels(labels: &BTreeSet<String>) -> BTreeSet<String> {
    labels.iter().filter(|label| !label.starts_with(INTERNAL_LABEL_PREFIX)).cloned().collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only sanitizer assertions."
    )]

    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use super::sanitize;
    use crate::audience::AudienceProfile;
    use crate::audience::AuthTier;
    use crate::identifiers::AudienceId;
    use crate::identifiers::ObjectId;
    use crate::object::ExternalReference;
    use crate::object::IntelObject;
    use crate::object::Provenance;
    use crate::object::ReportObject;
    use crate::tlp::TlpLevel;

    fn profile(sanitize_flag: bool) -> AudienceProfile {
        AudienceProfile {
            id: AudienceId::new("bank"),
            tlp: TlpLevel::Amber,
            auth_tier: AuthTier::PartnerKey,
            include_reports: true,
            include_high_confidence_iocs: false,
            max_reports: None,
            max_observables: None,
            allowed_labels: BTreeSet::new(),
            min_confidence: None,
            sanitize: sanitize_flag,
        }
    }

    fn tainted_report() -> IntelObject {
        let labels: BTreeSet<String> =
            ["osint".to_string(), "internal:case-42".to_string()].into_iter().collect();
        IntelObject::Report(ReportObject {
            id: ObjectId::new("report--0001"),
            name: "Phishing wave".to_string(),
            description: Some("details".to_string()),
            report_types: vec!["threat-report".to_string()],
            labels,
            confidence: 80,
            created_at: "2026-08-01T00:00:00Z".to_string(),
            owner_ref: Some("identity--soc".to_string()),
            external_references: vec![ExternalReference {
                source_name: "case-tracker".to_string(),
                url: Some("https://tracker.internal/case/42".to_string()),
                description: None,
            }],
            provenance: Some(Provenance {
                connector: "rss-ingestor".to_string(),
                enrichment: BTreeMap::new(),
                score_trace: Some("base 60 + actor overlap 20".to_string()),
            }),
        })
    }

    #[test]
    fn sanitize_strips_restricted_fields() {
        let sanitized = sanitize(&tainted_report(), &profile(true));
        assert!(sanitized.owner_ref().is_none());
        assert!(sanitized.external_references().is_empty());
        assert!(sanitized.provenance().is_none());
        assert!(sanitized.labels().contains("osint"));
        assert!(!sanitized.labels().iter().any(|label| label.starts_with("internal:")));
    }

    #[test]
    fn sanitize_disabled_returns_object_unchanged() {
        let original = tainted_report();
        let copy = sanitize(&original, &profile(false));
        assert_eq!(copy, original);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let policy = profile(true);
        let once = sanitize(&tainted_report(), &policy);
        let twice = sanitize(&once, &policy);
        assert_eq!(once, twice);
    }
}
