// crates/intel-gate-export/src/artifacts.rs
// ============================================================================
// Module: Artifact Tree
// Description: Share tree layout and atomic artifact publication.
// Purpose: Guarantee readers only ever observe complete artifacts.
// Dependencies: intel-gate-core, tempfile, thiserror
// ============================================================================

//! ## Overview
//! The share tree has a fixed layout under one root: `public/bundle.json`
//! for the unauthenticated tier, `partners/{id}/...` per partner audience,
//! `internal/...` for the internal tier, and `index.json` at the root.
//! Every write goes to a temp file in the destination directory and is
//! renamed into place, so a concurrent reader sees either the previous
//! complete artifact or the new complete artifact. Abandoned temp files are
//! removed on drop and never renamed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use intel_gate_core::AudienceProfile;
use intel_gate_core::AuthTier;
use tempfile::NamedTempFile;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Relative path of the share manifest.
pub const MANIFEST_PATH: &str = "index.json";
/// Relative path of the public bundle artifact.
pub const PUBLIC_BUNDLE_PATH: &str = "public/bundle.json";
/// Relative path of the internal reports artifact.
pub const INTERNAL_REPORTS_PATH: &str = "internal/reports.json";
/// Partner artifact filename for report bundles.
pub const PARTNER_REPORTS_FILE: &str = "reports.json";
/// Partner artifact filename for high-confidence IOC bundles.
pub const PARTNER_IOCS_FILE: &str = "iocs_high.json";
/// Partner artifact filename for sanitized previews.
pub const PARTNER_PREVIEW_FILE: &str = "preview.json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Artifact publication errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Filesystem failure while staging or renaming an artifact.
    #[error("publish io error: {0}")]
    Io(String),
    /// Artifact path escapes the share tree.
    #[error("invalid artifact path: {0}")]
    InvalidPath(String),
}

// ============================================================================
// SECTION: Artifact Tree
// ============================================================================

/// Handle to the share tree root with atomic write operations.
#[derive(Debug, Clone)]
pub struct ArtifactTree {
    /// Absolute or working-directory-relative share root.
    root: PathBuf,
}

impl ArtifactTree {
    /// Creates a handle for the given share root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the share root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the relative paths of the artifacts an audience can publish.
    #[must_use]
    pub fn audience_paths(profile: &AudienceProfile) -> Vec<String> {
        match profile.auth_tier {
            AuthTier::None => vec![PUBLIC_BUNDLE_PATH.to_string()],
            AuthTier::InternalKey => vec![INTERNAL_REPORTS_PATH.to_string()],
            AuthTier::PartnerKey => {
                let mut paths = Vec::new();
                if profile.include_reports {
                    paths.push(partner_path(profile.id.as_str(), PARTNER_REPORTS_FILE));
                }
                if profile.include_high_confidence_iocs {
                    paths.push(partner_path(profile.id.as_str(), PARTNER_IOCS_FILE));
                }
                paths.push(partner_path(profile.id.as_str(), PARTNER_PREVIEW_FILE));
                paths
            }
        }
    }

    /// Returns the absolute path of a relative artifact path.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidPath`] when the relative path contains
    /// parent or root components.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PublishError> {
        validate_relative_path(relative)?;
        Ok(self.root.join(relative))
    }

    /// Returns whether an artifact currently exists in the tree.
    #[must_use]
    pub fn exists(&self, relative: &str) -> bool {
        self.resolve(relative).is_ok_and(|path| path.is_file())
    }

    /// Reads an artifact's bytes when present.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] on path or read failures.
    pub fn read(&self, relative: &str) -> Result<Vec<u8>, PublishError> {
        let path = self.resolve(relative)?;
        fs::read(&path).map_err(|err| PublishError::Io(err.to_string()))
    }

    /// Atomically publishes an artifact at a relative path.
    ///
    /// The bytes are staged in a temp file inside the destination directory
    /// and renamed over the target in one step.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when staging or renaming fails.
    pub fn write_atomic(&self, relative: &str, bytes: &[u8]) -> Result<(), PublishError> {
        let target = self.resolve(relative)?;
        let parent = target
            .parent()
            .ok_or_else(|| PublishError::InvalidPath(relative.to_string()))?;
        fs::create_dir_all(parent).map_err(|err| PublishError::Io(err.to_string()))?;
        let mut staged =
            NamedTempFile::new_in(parent).map_err(|err| PublishError::Io(err.to_string()))?;
        staged.write_all(bytes).map_err(|err| PublishError::Io(err.to_string()))?;
        staged.flush().map_err(|err| PublishError::Io(err.to_string()))?;
        staged.persist(&target).map_err(|err| PublishError::Io(err.to_string()))?;
        Ok(())
    }
}

/// Builds a partner-relative artifact path.
#[must_use]
pub fn partner_path(partner: &str, file: &str) -> String {
    format!("partners/{partner}/{file}")
}

/// Rejects relative paths that could escape the share root.
fn validate_relative_path(relative: &str) -> Result<(), PublishError> {
    if relative.is_empty() || relative.starts_with('/') {
        return Err(PublishError::InvalidPath(relative.to_string()));
    }
    for component in relative.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(PublishError::InvalidPath(relative.to_string()));
        }
    }
    Ok(())
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
        reason = "Test-only artifact assertions."
    )]

    use std::collections::BTreeSet;

    use intel_gate_core::AudienceProfile;
    use intel_gate_core::AuthTier;
    use intel_gate_core::TlpLevel;
    use intel_gate_core::identifiers::AudienceId;
    use tempfile::TempDir;

    use super::ArtifactTree;

    fn partner_profile(iocs: bool) -> AudienceProfile {
        AudienceProfile {
            id: AudienceId::new("fin-isac"),
            tlp: TlpLevel::Amber,
            auth_tier: AuthTier::PartnerKey,
            include_reports: true,
            include_high_confidence_iocs: iocs,
            max_reports: None,
            max_observables: None,
            allowed_labels: BTreeSet::new(),
            min_confidence: None,
            sanitize: true,
        }
    }

    #[test]
    fn write_atomic_replaces_existing_artifact() {
        let dir = TempDir::new().unwrap();
        let tree = ArtifactTree::new(dir.path());
        tree.write_atomic("public/bundle.json", b"{\"v\":1}").unwrap();
        tree.write_atomic("public/bundle.json", b"{\"v\":2}").unwrap();
        assert_eq!(tree.read("public/bundle.json").unwrap(), b"{\"v\":2}");
    }

    #[test]
    fn resolve_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let tree = ArtifactTree::new(dir.path());
        assert!(tree.resolve("../outside.json").is_err());
        assert!(tree.resolve("partners/../../etc/passwd").is_err());
        assert!(tree.resolve("/absolute.json").is_err());
        assert!(tree.resolve("").is_err());
    }

    #[test]
    fn audience_paths_follow_tier_layout() {
        let paths = ArtifactTree::audience_paths(&partner_profile(true));
        assert_eq!(
            paths,
            vec![
                "partners/fin-isac/reports.json".to_string(),
                "partners/fin-isac/iocs_high.json".to_string(),
                "partners/fin-isac/preview.json".to_string(),
            ]
        );
        let without_iocs = ArtifactTree::audience_paths(&partner_profile(false));
        assert!(!without_iocs.contains(&"partners/fin-isac/iocs_high.json".to_string()));
    }

    #[test]
    fn exists_reflects_tree_state() {
        let dir = TempDir::new().unwrap();
        let tree = ArtifactTree::new(dir.path());
        assert!(!tree.exists("internal/reports.json"));
        tree.write_atomic("internal/reports.json", b"{}").unwrap();
        assert!(tree.exists("internal/reports.json"));
    }
}
