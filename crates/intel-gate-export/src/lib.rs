// crates/intel-gate-export/src/lib.rs
// ============================================================================
// Module: Intel Gate Export Library
// Description: Export orchestration and atomic artifact publication.
// Purpose: Turn upstream snapshots into per-audience share artifacts.
// Dependencies: intel-gate-config, intel-gate-core, intel-gate-source, tokio
// ============================================================================

//! ## Overview
//! `intel-gate-export` owns the write side of the share tree: the artifact
//! layout with atomic publishes, the cycle orchestrator, the periodic
//! single-flight runner, and the export audit events.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifacts;
pub mod audit;
pub mod orchestrator;
pub mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::ArtifactTree;
pub use artifacts::MANIFEST_PATH;
pub use artifacts::PublishError;
pub use audit::ExportAuditEvent;
pub use audit::ExportAuditSink;
pub use audit::NoopExportAuditSink;
pub use audit::StderrExportAuditSink;
pub use orchestrator::CycleReport;
pub use orchestrator::ExportError;
pub use orchestrator::ExportOrchestrator;
pub use orchestrator::HIGH_CONFIDENCE_THRESHOLD;
pub use orchestrator::PREVIEW_MAX_OBJECTS;
pub use runner::ExportRunner;
