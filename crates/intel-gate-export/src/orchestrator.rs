// crates/intel-gate-export/src/orchestrator.rs
// ============================================================================
// Module: Export Orchestrator
// Description: Cycle-driven production of per-audience share artifacts.
// Purpose: Fetch once, build per-audience bundles, publish atomically.
// Dependencies: intel-gate-config, intel-gate-core, intel-gate-source
// ============================================================================

//! ## Overview
//! One export cycle fetches each object kind exactly once, then builds and
//! publishes the artifacts of every configured audience from that single
//! snapshot. A fetch failure aborts the whole cycle and leaves previously
//! published artifacts untouched. A failure while publishing one audience is
//! isolated: remaining audiences still publish. The manifest is rewritten
//! last and only lists artifacts that exist on disk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use intel_gate_config::PolicyStore;
use intel_gate_core::AudienceProfile;
use intel_gate_core::AuthTier;
use intel_gate_core::BundleBuilder;
use intel_gate_core::BundleOutcome;
use intel_gate_core::IntelObject;
use intel_gate_core::ObjectKind;
use intel_gate_core::ShareManifest;
use intel_gate_source::SourceClient;
use intel_gate_source::SourceError;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::artifacts::ArtifactTree;
use crate::artifacts::INTERNAL_REPORTS_PATH;
use crate::artifacts::MANIFEST_PATH;
use crate::artifacts::PARTNER_IOCS_FILE;
use crate::artifacts::PARTNER_PREVIEW_FILE;
use crate::artifacts::PARTNER_REPORTS_FILE;
use crate::artifacts::PUBLIC_BUNDLE_PATH;
use crate::artifacts::PublishError;
use crate::artifacts::partner_path;
use crate::audit::ExportAuditEvent;
use crate::audit::ExportAuditSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Confidence floor for the partner high-confidence IOC artifact.
pub const HIGH_CONFIDENCE_THRESHOLD: u8 = 75;
/// Maximum report count in a partner preview artifact.
pub const PREVIEW_MAX_OBJECTS: usize = 5;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Export cycle errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Upstream fetch failed; the cycle was aborted.
    #[error("cycle aborted: {0}")]
    Fetch(#[from] SourceError),
    /// The share manifest could not be written.
    #[error("manifest publish failed: {0}")]
    Manifest(#[from] PublishError),
    /// Clock or timestamp formatting failure.
    #[error("time error: {0}")]
    Time(String),
}

// ============================================================================
// SECTION: Cycle Report
// ============================================================================

/// Summary of one completed export cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Generation timestamp of the cycle, RFC 3339.
    pub generated_at: String,
    /// Audiences whose artifacts all published.
    pub published: Vec<String>,
    /// Audiences that failed to publish, with reasons.
    pub failed: Vec<(String, String)>,
    /// Total malformed objects skipped across audiences.
    pub skipped_objects: usize,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Policy-driven export orchestrator.
pub struct ExportOrchestrator {
    /// Compiled audience policies.
    policy: PolicyStore,
    /// Upstream source client.
    source: Arc<dyn SourceClient>,
    /// Share tree handle.
    tree: ArtifactTree,
    /// Audit sink for cycle events.
    audit: Arc<dyn ExportAuditSink>,
    /// Lookback window in days.
    lookback_days: u32,
    /// Maximum objects fetched per kind.
    fetch_limit: usize,
    /// Audiences that have published at least once, across restarts.
    published_ever: Mutex<BTreeSet<String>>,
    /// Cooperative shutdown flag checked between audiences.
    shutdown: AtomicBool,
}

impl ExportOrchestrator {
    /// Creates an orchestrator and seeds the published set from an existing
    /// manifest so restarts keep prior generations listed.
    #[must_use]
    pub fn new(
        policy: PolicyStore,
        source: Arc<dyn SourceClient>,
        tree: ArtifactTree,
        audit: Arc<dyn ExportAuditSink>,
        lookback_days: u32,
        fetch_limit: usize,
    ) -> Self {
        let mut published_ever = BTreeSet::new();
        if let Ok(bytes) = tree.read(MANIFEST_PATH)
            && let Ok(manifest) = ShareManifest::from_json_bytes(&bytes)
        {
            published_ever.extend(manifest.paths.keys().cloned());
        }
        Self {
            policy,
            source,
            tree,
            audit,
            lookback_days,
            fetch_limit,
            published_ever: Mutex::new(published_ever),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Requests cooperative shutdown; the running cycle stops before the
    /// next audience and no partially staged artifact is renamed.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Returns the share tree handle.
    #[must_use]
    pub const fn tree(&self) -> &ArtifactTree {
        &self.tree
    }

    /// Runs one export cycle.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when the fetch fails or the manifest cannot be
    /// written. Per-audience publish failures are reported in the
    /// [`CycleReport`], not as errors.
    pub fn run_cycle(&self) -> Result<CycleReport, ExportError> {
        let now = OffsetDateTime::now_utc();
        let generated_at =
            now.format(&Rfc3339).map_err(|err| ExportError::Time(err.to_string()))?;
        let generated_at_millis = i64::try_from(now.unix_timestamp_nanos() / 1_000_000)
            .map_err(|_| ExportError::Time("timestamp out of range".to_string()))?;
        self.audit.record(&ExportAuditEvent::cycle_started(&generated_at));

        let since = now - Duration::days(i64::from(self.lookback_days));
        let snapshot = match self.fetch_snapshot(since) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.audit.record(&ExportAuditEvent::fetch_failed(&error.to_string()));
                return Err(ExportError::Fetch(error));
            }
        };

        let mut report = CycleReport {
            generated_at: generated_at.clone(),
            published: Vec::new(),
            failed: Vec::new(),
            skipped_objects: 0,
        };
        for profile in self.policy.list_audiences() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match self.publish_audience(profile, &snapshot, generated_at_millis, &mut report) {
                Ok(()) => {
                    report.published.push(profile.id.to_string());
                    self.mark_published(profile.id.as_str());
                }
                Err(error) => {
                    let reason = error.to_string();
                    self.audit
                        .record(&ExportAuditEvent::audience_failed(profile.id.as_str(), &reason));
                    report.failed.push((profile.id.to_string(), reason));
                }
            }
        }

        self.write_manifest(&generated_at)?;
        Ok(report)
    }

    /// Fetches every kind once for the cycle.
    fn fetch_snapshot(&self, since: OffsetDateTime) -> Result<Vec<IntelObject>, SourceError> {
        let mut snapshot = self.source.fetch_reports(since, self.fetch_limit)?;
        snapshot.extend(self.source.fetch_observables(since, self.fetch_limit)?);
        snapshot.extend(self.source.fetch_indicators(since, self.fetch_limit)?);
        Ok(snapshot)
    }

    /// Builds and publishes every artifact of one audience.
    fn publish_audience(
        &self,
        profile: &AudienceProfile,
        snapshot: &[IntelObject],
        generated_at_millis: i64,
        report: &mut CycleReport,
    ) -> Result<(), PublishError> {
        match profile.auth_tier {
            AuthTier::None => {
                let input = tier_objects(profile, snapshot);
                self.publish_bundle(
                    profile,
                    PUBLIC_BUNDLE_PATH,
                    &input,
                    generated_at_millis,
                    report,
                )?;
            }
            AuthTier::InternalKey => {
                let input = tier_objects(profile, snapshot);
                self.publish_bundle(
                    profile,
                    INTERNAL_REPORTS_PATH,
                    &input,
                    generated_at_millis,
                    report,
                )?;
            }
            AuthTier::PartnerKey => {
                let partner = profile.id.as_str();
                if profile.include_reports {
                    let reports: Vec<IntelObject> = snapshot
                        .iter()
                        .filter(|object| object.kind() == ObjectKind::Report)
                        .cloned()
                        .collect();
                    self.publish_bundle(
                        profile,
                        &partner_path(partner, PARTNER_REPORTS_FILE),
                        &reports,
                        generated_at_millis,
                        report,
                    )?;
                }
                if profile.include_high_confidence_iocs {
                    let iocs: Vec<IntelObject> = snapshot
                        .iter()
                        .filter(|object| {
                            object.kind() != ObjectKind::Report
                                && object.confidence() >= HIGH_CONFIDENCE_THRESHOLD
                        })
                        .cloned()
                        .collect();
                    self.publish_bundle(
                        profile,
                        &partner_path(partner, PARTNER_IOCS_FILE),
                        &iocs,
                        generated_at_millis,
                        report,
                    )?;
                }
                // The preview is a teaser for prospective partners: capped
                // and sanitized regardless of the profile's own settings.
                let mut preview_profile = profile.clone();
                preview_profile.sanitize = true;
                preview_profile.max_reports = Some(PREVIEW_MAX_OBJECTS);
                let reports: Vec<IntelObject> = snapshot
                    .iter()
                    .filter(|object| object.kind() == ObjectKind::Report)
                    .cloned()
                    .collect();
                self.publish_bundle(
                    &preview_profile,
                    &partner_path(partner, PARTNER_PREVIEW_FILE),
                    &reports,
                    generated_at_millis,
                    report,
                )?;
            }
        }
        Ok(())
    }

    /// Builds one bundle and publishes it atomically.
    fn publish_bundle(
        &self,
        profile: &AudienceProfile,
        relative: &str,
        objects: &[IntelObject],
        generated_at_millis: i64,
        report: &mut CycleReport,
    ) -> Result<(), PublishError> {
        let outcome: BundleOutcome = BundleBuilder::build(profile, objects, generated_at_millis);
        for skipped in &outcome.skipped {
            self.audit.record(&ExportAuditEvent::object_skipped(
                profile.id.as_str(),
                skipped.id.as_str(),
                &skipped.reason,
            ));
        }
        report.skipped_objects += outcome.skipped.len();
        let bytes = outcome
            .bundle
            .to_json_bytes()
            .map_err(|err| PublishError::Io(err.to_string()))?;
        self.tree.write_atomic(relative, &bytes)?;
        self.audit.record(&ExportAuditEvent::audience_published(
            profile.id.as_str(),
            relative,
            outcome.included,
        ));
        Ok(())
    }

    /// Marks an audience as having published at least once.
    fn mark_published(&self, audience: &str) {
        let mut published =
            self.published_ever.lock().unwrap_or_else(PoisonError::into_inner);
        published.insert(audience.to_string());
    }

    /// Rewrites the share manifest from the current tree state.
    fn write_manifest(&self, generated_at: &str) -> Result<(), ExportError> {
        let mut manifest = ShareManifest::new(generated_at.to_string(), self.lookback_days);
        let published = {
            let guard = self.published_ever.lock().unwrap_or_else(PoisonError::into_inner);
            guard.clone()
        };
        for profile in self.policy.list_audiences() {
            if !published.contains(profile.id.as_str()) {
                continue;
            }
            for path in ArtifactTree::audience_paths(profile) {
                if self.tree.exists(&path) {
                    manifest.record(profile.id.as_str(), path);
                }
            }
        }
        let path_count = manifest.all_paths().count();
        let bytes = manifest
            .to_json_bytes()
            .map_err(|err| ExportError::Manifest(PublishError::Io(err.to_string())))?;
        self.tree.write_atomic(MANIFEST_PATH, &bytes)?;
        self.audit.record(&ExportAuditEvent::manifest_written(generated_at, path_count));
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Selects the snapshot subset for single-bundle tiers.
fn tier_objects(profile: &AudienceProfile, snapshot: &[IntelObject]) -> Vec<IntelObject> {
    snapshot
        .iter()
        .filter(|object| profile.include_reports || object.kind() != ObjectKind::Report)
        .cloned()
        .collect()
}
