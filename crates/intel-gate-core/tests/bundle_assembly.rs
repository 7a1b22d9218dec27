// crates/intel-gate-core/tests/bundle_assembly.rs
// ============================================================================
// Module: Bundle Assembly Tests
// Description: End-to-end bundle construction across audience policies.
// Purpose: Verify filter ordering, caps, sanitization, and envelope layout.
// Dependencies: intel-gate-core, serde_json
// ============================================================================

//! ## Overview
//! Integration tests driving the bundle builder with realistic mixed-kind
//! snapshots under partner, public, and internal audience policies.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, reason = "Test code.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use intel_gate_core::AudienceProfile;
use intel_gate_core::AuthTier;
use intel_gate_core::BundleBuilder;
use intel_gate_core::ExternalReference;
use intel_gate_core::IntelObject;
use intel_gate_core::ObservableObject;
use intel_gate_core::Provenance;
use intel_gate_core::ReportObject;
use intel_gate_core::TlpLevel;
use intel_gate_core::identifiers::AudienceId;
use intel_gate_core::identifiers::ObjectId;

/// Test-local result alias.
type TestResult = Result<(), String>;

fn report(index: usize, labels: &[&str], confidence: u8) -> IntelObject {
    IntelObject::Report(ReportObject {
        id: ObjectId::new(format!("report--{index:04}")),
        name: format!("Campaign update {index}"),
        description: Some("observed activity".to_string()),
        report_types: vec!["threat-report".to_string()],
        labels: labels.iter().map(ToString::to_string).collect(),
        confidence,
        created_at: "2026-08-10T12:00:00Z".to_string(),
        owner_ref: Some("identity--soc-team".to_string()),
        external_references: vec![ExternalReference {
            source_name: "case-tracker".to_string(),
            url: Some("https://cases.example.internal/77".to_string()),
            description: None,
        }],
        provenance: Some(Provenance {
            connector: "feed-ingestor".to_string(),
            enrichment: BTreeMap::new(),
            score_trace: None,
        }),
    })
}

fn observable(index: usize, confidence: u8) -> IntelObject {
    IntelObject::Observable(ObservableObject {
        id: ObjectId::new(format!("observable--{index:04}")),
        value: format!("203.0.113.{index}"),
        observable_type: "IPv4-Addr".to_string(),
        labels: ["osint".to_string()].into_iter().collect(),
        confidence,
        created_at: "2026-08-10T12:00:00Z".to_string(),
        owner_ref: None,
        external_references: Vec::new(),
        provenance: None,
    })
}

fn partner_profile() -> AudienceProfile {
    AudienceProfile {
        id: AudienceId::new("fin-isac"),
        tlp: TlpLevel::Amber,
        auth_tier: AuthTier::PartnerKey,
        include_reports: true,
        include_high_confidence_iocs: true,
        max_reports: Some(20),
        max_observables: None,
        allowed_labels: ["osint", "otx", "honeypot"].iter().map(ToString::to_string).collect(),
        min_confidence: None,
        sanitize: true,
    }
}

#[test]
fn partner_bundle_filters_caps_and_sanitizes() -> TestResult {
    let mut objects = Vec::new();
    for index in 0..30 {
        objects.push(report(index, &["osint", "internal:case-9"], 70));
    }
    for index in 30..50 {
        objects.push(report(index, &["vendor-private"], 95));
    }

    let outcome = BundleBuilder::build(&partner_profile(), &objects, 1_724_400_000_000);
    if outcome.included != 20 {
        return Err(format!("expected 20 included objects, got {}", outcome.included));
    }

    let value = outcome.bundle.to_value();
    if value["spec_version"] != "2.1" || value["type"] != "bundle" {
        return Err("bundle envelope missing STIX 2.1 framing".to_string());
    }
    let stix_objects = value["objects"].as_array().ok_or("objects not an array")?;
    if stix_objects[0]["definition"]["tlp"] != "amber" {
        return Err("first object is not the amber marking".to_string());
    }
    for object in &stix_objects[1..] {
        if object.get("x_owner_ref").is_some()
            || object.get("external_references").is_some()
            || object.get("x_provenance").is_some()
        {
            return Err(format!("restricted field leaked in {}", object["id"]));
        }
        let labels = object["labels"].as_array().ok_or("labels missing")?;
        if labels.iter().any(|label| {
            label.as_str().is_some_and(|text| text.starts_with("internal:"))
        }) {
            return Err("internal label leaked into partner bundle".to_string());
        }
    }
    Ok(())
}

#[test]
fn internal_bundle_preserves_provenance() -> TestResult {
    let profile = AudienceProfile {
        id: AudienceId::new("internal"),
        tlp: TlpLevel::Red,
        auth_tier: AuthTier::InternalKey,
        include_reports: true,
        include_high_confidence_iocs: true,
        max_reports: None,
        max_observables: None,
        allowed_labels: BTreeSet::new(),
        min_confidence: None,
        sanitize: false,
    };
    let objects = vec![report(0, &["osint", "internal:case-9"], 70)];
    let outcome = BundleBuilder::build(&profile, &objects, 7);
    let value = outcome.bundle.to_value();
    let stix = &value["objects"][1];
    if stix["x_owner_ref"] != "identity--soc-team" {
        return Err("owner reference dropped from internal bundle".to_string());
    }
    if stix["x_provenance"]["connector"] != "feed-ingestor" {
        return Err("provenance dropped from internal bundle".to_string());
    }
    Ok(())
}

#[test]
fn observable_caps_do_not_consume_report_budget() -> TestResult {
    let mut profile = partner_profile();
    profile.max_reports = Some(2);
    profile.max_observables = Some(3);
    let mut objects = Vec::new();
    for index in 0..5 {
        objects.push(report(index, &["osint"], 80));
        objects.push(observable(index, 80));
    }
    let outcome = BundleBuilder::build(&profile, &objects, 7);
    if outcome.included != 5 {
        return Err(format!("expected 2 reports + 3 observables, got {}", outcome.included));
    }
    Ok(())
}

#[test]
fn bundles_for_same_generation_share_an_id() -> TestResult {
    let objects = vec![report(0, &["osint"], 70)];
    let first = BundleBuilder::build(&partner_profile(), &objects, 99);
    let second = BundleBuilder::build(&partner_profile(), &objects, 99);
    if first.bundle.id != second.bundle.id {
        return Err("bundle id changed across identical generations".to_string());
    }
    let other = BundleBuilder::build(&partner_profile(), &objects, 100);
    if first.bundle.id == other.bundle.id {
        return Err("bundle id collided across generations".to_string());
    }
    Ok(())
}
