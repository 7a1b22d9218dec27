// crates/intel-gate-core/src/manifest.rs
// ============================================================================
// Module: Share Manifest
// Description: Machine-readable index of published artifacts.
// Purpose: Advertise what the current generation of the share tree contains.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The manifest is published at the share root after every export cycle. It
//! lists the relative paths of the artifacts present on disk, grouped per
//! audience, along with the generation timestamp and the lookback window the
//! cycle used. Paths are relative to the share root; the manifest never lists
//! a path that does not exist.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Index of the artifacts present in the share tree for one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareManifest {
    /// RFC 3339 timestamp of the generation that produced this manifest.
    pub generated_at: String,
    /// Lookback window in days used by the producing cycle.
    pub lookback_days: u32,
    /// Relative artifact paths per audience identifier, path-sorted.
    pub paths: BTreeMap<String, Vec<String>>,
}

impl ShareManifest {
    /// Creates an empty manifest for the given generation.
    #[must_use]
    pub const fn new(generated_at: String, lookback_days: u32) -> Self {
        Self {
            generated_at,
            lookback_days,
            paths: BTreeMap::new(),
        }
    }

    /// Records an artifact path under the given audience, keeping paths sorted.
    pub fn record(&mut self, audience: &str, path: impl Into<String>) {
        let entries = self.paths.entry(audience.to_string()).or_default();
        let path = path.into();
        if let Err(position) = entries.binary_search(&path) {
            entries.insert(position, path);
        }
    }

    /// Returns every recorded path across all audiences.
    pub fn all_paths(&self) -> impl Iterator<Item = &str> {
        self.paths.values().flatten().map(String::as_str)
    }

    /// Serializes the manifest to pretty-printed JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` when serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Parses a manifest from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` when the bytes are not a valid manifest.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
