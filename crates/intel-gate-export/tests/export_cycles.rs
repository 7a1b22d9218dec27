//! Export cycle tests for intel-gate-export.
// crates/intel-gate-export/tests/export_cycles.rs
// =============================================================================
// Module: Export Cycle Tests
// Description: End-to-end cycles against a temp share tree.
// Purpose: Verify tier artifacts, isolation, manifest behavior, and aborts.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use intel_gate_config::IntelGateConfig;
use intel_gate_config::PolicyStore;
use intel_gate_core::IntelObject;
use intel_gate_core::ObservableObject;
use intel_gate_core::Provenance;
use intel_gate_core::ReportObject;
use intel_gate_core::ShareManifest;
use intel_gate_core::identifiers::ObjectId;
use intel_gate_export::ArtifactTree;
use intel_gate_export::ExportOrchestrator;
use intel_gate_export::NoopExportAuditSink;
use intel_gate_source::StaticSourceClient;
use serde_json::Value;
use tempfile::TempDir;

type TestResult = Result<(), String>;

const CONFIG: &str = r#"
[export]
share_dir = "/var/lib/intel-gate/share"
interval_secs = 300
lookback_days = 30
fetch_limit = 2000

[source]
base_url = "https://opencti.example.net"
api_token = "token"

[keys]
internal_keys = ["internal-key"]

[keys.partner_keys]
fin-isac = "partner-key"

[[audiences]]
id = "public"
tlp = "clear"
auth_tier = "none"
include_reports = true
max_reports = 20
allowed_labels = ["osint"]
min_confidence = 60
sanitize = true

[[audiences]]
id = "fin-isac"
tlp = "amber"
auth_tier = "partner_key"
include_reports = true
include_high_confidence_iocs = true
allowed_labels = ["osint", "otx"]
sanitize = false

[[audiences]]
id = "internal"
tlp = "red"
auth_tier = "internal_key"
include_reports = true
sanitize = false
"#;

fn policy() -> PolicyStore {
    let config = IntelGateConfig::from_toml(CONFIG).unwrap();
    PolicyStore::from_config(&config).unwrap()
}

fn report(index: usize, labels: &[&str], confidence: u8) -> IntelObject {
    IntelObject::Report(ReportObject {
        id: ObjectId::new(format!("report--{index:04}")),
        name: format!("Report {index}"),
        description: Some("activity summary".to_string()),
        report_types: vec!["threat-report".to_string()],
        labels: labels.iter().map(ToString::to_string).collect(),
        confidence,
        created_at: "2026-08-10T12:00:00Z".to_string(),
        owner_ref: Some("identity--soc".to_string()),
        external_references: Vec::new(),
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
        value: format!("198.51.100.{index}"),
        observable_type: "IPv4-Addr".to_string(),
        labels: ["osint".to_string()].into_iter().collect(),
        confidence,
        created_at: "2026-08-10T12:00:00Z".to_string(),
        owner_ref: None,
        external_references: Vec::new(),
        provenance: None,
    })
}

fn orchestrator(dir: &TempDir, source: Arc<StaticSourceClient>) -> ExportOrchestrator {
    ExportOrchestrator::new(
        policy(),
        source,
        ArtifactTree::new(dir.path()),
        Arc::new(NoopExportAuditSink),
        30,
        2_000,
    )
}

fn read_bundle(dir: &TempDir, relative: &str) -> Result<Value, String> {
    let bytes = fs::read(dir.path().join(relative)).map_err(|err| err.to_string())?;
    serde_json::from_slice(&bytes).map_err(|err| err.to_string())
}

#[test]
fn cycle_publishes_every_tier_artifact() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let reports: Vec<IntelObject> = (0..30)
        .map(|index| report(index, if index < 25 { &["osint"] } else { &["vendor"] }, 70))
        .collect();
    let observables: Vec<IntelObject> =
        (0..10).map(|index| observable(index, if index < 4 { 90 } else { 60 })).collect();
    let source = Arc::new(StaticSourceClient::new(reports, observables, Vec::new()));
    let orchestrator = orchestrator(&dir, source);

    let outcome = orchestrator.run_cycle().map_err(|err| err.to_string())?;
    if outcome.published.len() != 3 || !outcome.failed.is_empty() {
        return Err(format!(
            "unexpected cycle outcome: {} published, {} failed",
            outcome.published.len(),
            outcome.failed.len()
        ));
    }
    for artifact in [
        "public/bundle.json",
        "partners/fin-isac/reports.json",
        "partners/fin-isac/iocs_high.json",
        "partners/fin-isac/preview.json",
        "internal/reports.json",
        "index.json",
    ] {
        if !dir.path().join(artifact).is_file() {
            return Err(format!("missing artifact: {artifact}"));
        }
    }
    Ok(())
}

#[test]
fn public_bundle_is_filtered_capped_and_sanitized() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let reports: Vec<IntelObject> =
        (0..40).map(|index| report(index, &["osint"], 70)).collect();
    let source = Arc::new(StaticSourceClient::new(reports, Vec::new(), Vec::new()));
    orchestrator(&dir, source).run_cycle().map_err(|err| err.to_string())?;

    let bundle = read_bundle(&dir, "public/bundle.json")?;
    let objects = bundle["objects"].as_array().ok_or("objects not an array")?;
    // One clear marking plus the capped 20 reports.
    if objects.len() != 21 {
        return Err(format!("expected 21 objects, got {}", objects.len()));
    }
    if objects[0]["definition"]["tlp"] != "clear" {
        return Err("public bundle missing clear marking".to_string());
    }
    for object in &objects[1..] {
        if object.get("x_owner_ref").is_some() || object.get("x_provenance").is_some() {
            return Err("restricted field leaked into public bundle".to_string());
        }
    }
    Ok(())
}

#[test]
fn internal_bundle_retains_provenance_for_large_snapshot() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let reports: Vec<IntelObject> =
        (0..1_000).map(|index| report(index, &["internal:case"], 50)).collect();
    let source = Arc::new(StaticSourceClient::new(reports, Vec::new(), Vec::new()));
    orchestrator(&dir, source).run_cycle().map_err(|err| err.to_string())?;

    let bundle = read_bundle(&dir, "internal/reports.json")?;
    let objects = bundle["objects"].as_array().ok_or("objects not an array")?;
    if objects.len() != 1_001 {
        return Err(format!("expected 1001 objects, got {}", objects.len()));
    }
    if objects[1]["x_provenance"]["connector"] != "feed-ingestor" {
        return Err("internal bundle lost provenance".to_string());
    }
    if objects[0]["definition"]["tlp"] != "red" {
        return Err("internal bundle missing red marking".to_string());
    }
    Ok(())
}

#[test]
fn fetch_failure_aborts_cycle_and_keeps_previous_artifacts() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let source = Arc::new(StaticSourceClient::new(
        vec![report(0, &["osint"], 70)],
        Vec::new(),
        Vec::new(),
    ));
    let orchestrator = orchestrator(&dir, Arc::clone(&source));
    orchestrator.run_cycle().map_err(|err| err.to_string())?;
    let before = fs::read(dir.path().join("public/bundle.json")).map_err(|err| err.to_string())?;
    let manifest_before =
        fs::read(dir.path().join("index.json")).map_err(|err| err.to_string())?;

    source.set_failing(true);
    if orchestrator.run_cycle().is_ok() {
        return Err("expected fetch failure to abort the cycle".to_string());
    }
    let after = fs::read(dir.path().join("public/bundle.json")).map_err(|err| err.to_string())?;
    let manifest_after =
        fs::read(dir.path().join("index.json")).map_err(|err| err.to_string())?;
    if before != after || manifest_before != manifest_after {
        return Err("aborted cycle modified published artifacts".to_string());
    }
    Ok(())
}

#[test]
fn audience_publish_failure_is_isolated() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    // A regular file where the partners directory belongs makes every
    // partner publish fail while other tiers proceed.
    fs::write(dir.path().join("partners"), b"blocker").map_err(|err| err.to_string())?;
    let source = Arc::new(StaticSourceClient::new(
        vec![report(0, &["osint"], 70)],
        Vec::new(),
        Vec::new(),
    ));
    let outcome = orchestrator(&dir, source).run_cycle().map_err(|err| err.to_string())?;
    if !outcome.failed.iter().any(|(audience, _)| audience == "fin-isac") {
        return Err("expected fin-isac to fail".to_string());
    }
    if !outcome.published.contains(&"public".to_string())
        || !outcome.published.contains(&"internal".to_string())
    {
        return Err("healthy audiences did not publish".to_string());
    }
    let manifest_bytes =
        fs::read(dir.path().join("index.json")).map_err(|err| err.to_string())?;
    let manifest =
        ShareManifest::from_json_bytes(&manifest_bytes).map_err(|err| err.to_string())?;
    if manifest.paths.contains_key("fin-isac") {
        return Err("manifest lists artifacts that were never published".to_string());
    }
    Ok(())
}

#[test]
fn malformed_objects_are_skipped_not_fatal() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let mut bad = report(0, &["osint"], 70);
    if let IntelObject::Report(inner) = &mut bad {
        inner.created_at = "not-a-timestamp".to_string();
    }
    let source = Arc::new(StaticSourceClient::new(
        vec![bad, report(1, &["osint"], 70)],
        Vec::new(),
        Vec::new(),
    ));
    let outcome = orchestrator(&dir, source).run_cycle().map_err(|err| err.to_string())?;
    if outcome.skipped_objects == 0 {
        return Err("expected skipped objects to be reported".to_string());
    }
    let bundle = read_bundle(&dir, "public/bundle.json")?;
    let objects = bundle["objects"].as_array().ok_or("objects not an array")?;
    if objects.len() != 2 {
        return Err(format!("expected marking plus one report, got {}", objects.len()));
    }
    Ok(())
}

#[test]
fn preview_is_capped_and_sanitized_even_for_unsanitized_partners() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let reports: Vec<IntelObject> =
        (0..10).map(|index| report(index, &["osint"], 70)).collect();
    let source = Arc::new(StaticSourceClient::new(reports, Vec::new(), Vec::new()));
    orchestrator(&dir, source).run_cycle().map_err(|err| err.to_string())?;

    let full = read_bundle(&dir, "partners/fin-isac/reports.json")?;
    if full["objects"][1].get("x_owner_ref").is_none() {
        return Err("partner reports should keep owner refs (sanitize = false)".to_string());
    }
    let preview = read_bundle(&dir, "partners/fin-isac/preview.json")?;
    let objects = preview["objects"].as_array().ok_or("objects not an array")?;
    if objects.len() != 6 {
        return Err(format!("expected marking plus 5 previews, got {}", objects.len()));
    }
    for object in &objects[1..] {
        if object.get("x_owner_ref").is_some() {
            return Err("preview leaked owner refs".to_string());
        }
    }
    Ok(())
}

#[test]
fn ioc_artifact_applies_confidence_floor_and_excludes_reports() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let observables = vec![observable(0, 90), observable(1, 74), observable(2, 75)];
    let source = Arc::new(StaticSourceClient::new(
        vec![report(0, &["osint"], 95)],
        observables,
        Vec::new(),
    ));
    orchestrator(&dir, source).run_cycle().map_err(|err| err.to_string())?;

    let bundle = read_bundle(&dir, "partners/fin-isac/iocs_high.json")?;
    let objects = bundle["objects"].as_array().ok_or("objects not an array")?;
    // Marking plus the two observables at or above the floor.
    if objects.len() != 3 {
        return Err(format!("expected 3 objects, got {}", objects.len()));
    }
    for object in &objects[1..] {
        if object["type"] == "report" {
            return Err("reports leaked into the IOC artifact".to_string());
        }
    }
    Ok(())
}

#[test]
fn manifest_seeding_survives_restart() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let source = Arc::new(StaticSourceClient::new(
        vec![report(0, &["osint"], 70)],
        Vec::new(),
        Vec::new(),
    ));
    orchestrator(&dir, Arc::clone(&source)).run_cycle().map_err(|err| err.to_string())?;

    // A fresh orchestrator over the same tree, shut down before any
    // audience runs, must still list the prior generation's artifacts.
    let restarted = orchestrator(&dir, source);
    restarted.request_shutdown();
    restarted.run_cycle().map_err(|err| err.to_string())?;
    let manifest_bytes =
        fs::read(dir.path().join("index.json")).map_err(|err| err.to_string())?;
    let manifest =
        ShareManifest::from_json_bytes(&manifest_bytes).map_err(|err| err.to_string())?;
    if !manifest.paths.contains_key("public") || !manifest.paths.contains_key("fin-isac") {
        return Err("restart dropped previously published audiences".to_string());
    }
    Ok(())
}

#[test]
fn manifest_lists_only_existing_paths() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let source = Arc::new(StaticSourceClient::new(
        vec![report(0, &["osint"], 70)],
        Vec::new(),
        Vec::new(),
    ));
    orchestrator(&dir, source).run_cycle().map_err(|err| err.to_string())?;
    let manifest_bytes =
        fs::read(dir.path().join("index.json")).map_err(|err| err.to_string())?;
    let manifest =
        ShareManifest::from_json_bytes(&manifest_bytes).map_err(|err| err.to_string())?;
    for path in manifest.all_paths() {
        if !dir.path().join(path).is_file() {
            return Err(format!("manifest lists missing artifact: {path}"));
        }
    }
    if manifest.lookback_days != 30 {
        return Err("manifest lookback_days mismatch".to_string());
    }
    Ok(())
}
