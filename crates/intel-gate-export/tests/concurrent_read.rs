//! Concurrent reader tests for intel-gate-export.
// crates/intel-gate-export/tests/concurrent_read.rs
// =============================================================================
// Module: Concurrent Read Tests
// Description: Polling reader racing repeated publish cycles.
// Purpose: Verify readers only ever observe complete artifacts.
// =============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;

use intel_gate_config::IntelGateConfig;
use intel_gate_config::PolicyStore;
use intel_gate_core::IntelObject;
use intel_gate_core::ReportObject;
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

[source]
base_url = "https://opencti.example.net"
api_token = "token"

[keys]
internal_keys = ["internal-key"]

[[audiences]]
id = "public"
tlp = "clear"
auth_tier = "none"
sanitize = true
"#;

fn report(index: usize) -> IntelObject {
    IntelObject::Report(ReportObject {
        id: ObjectId::new(format!("report--{index:04}")),
        name: format!("Report {index}"),
        description: Some("activity summary".repeat(16)),
        report_types: vec!["threat-report".to_string()],
        labels: ["osint".to_string()].into_iter().collect(),
        confidence: 70,
        created_at: "2026-08-10T12:00:00Z".to_string(),
        owner_ref: None,
        external_references: Vec::new(),
        provenance: None,
    })
}

#[test]
fn polling_reader_never_observes_a_partial_bundle() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let config = IntelGateConfig::from_toml(CONFIG).map_err(|err| err.to_string())?;
    let policy = PolicyStore::from_config(&config).map_err(|err| err.to_string())?;
    let source = Arc::new(StaticSourceClient::new(
        (0..200).map(report).collect(),
        Vec::new(),
        Vec::new(),
    ));
    let orchestrator = ExportOrchestrator::new(
        policy,
        source,
        ArtifactTree::new(dir.path()),
        Arc::new(NoopExportAuditSink),
        30,
        1_000,
    );
    // First publish so the reader always has a file to race against.
    orchestrator.run_cycle().map_err(|err| err.to_string())?;

    let bundle_path = dir.path().join("public/bundle.json");
    let stop = Arc::new(AtomicBool::new(false));
    let reader_stop = Arc::clone(&stop);
    let reader_path = bundle_path.clone();
    let reader = thread::spawn(move || -> Result<usize, String> {
        let mut reads = 0_usize;
        while !reader_stop.load(Ordering::SeqCst) {
            let bytes = fs::read(&reader_path).map_err(|err| err.to_string())?;
            let bundle: Value = serde_json::from_slice(&bytes)
                .map_err(|err| format!("partial artifact observed: {err}"))?;
            let objects =
                bundle["objects"].as_array().ok_or("objects not an array")?;
            if objects.len() != 201 {
                return Err(format!("incomplete bundle: {} objects", objects.len()));
            }
            reads += 1;
        }
        Ok(reads)
    });

    for _ in 0..25 {
        orchestrator.run_cycle().map_err(|err| err.to_string())?;
    }
    stop.store(true, Ordering::SeqCst);
    let reads = reader
        .join()
        .map_err(|_| "reader thread panicked".to_string())??;
    if reads == 0 {
        return Err("reader never completed a read".to_string());
    }
    Ok(())
}
