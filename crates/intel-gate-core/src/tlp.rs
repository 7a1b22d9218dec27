// crates/intel-gate-core/src/tlp.rs
// ============================================================================
// Module: TLP Markings
// Description: Traffic Light Protocol levels and STIX marking-definition objects.
// Purpose: Provide the fixed marking triple referenced by every published bundle.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every bundle carries exactly one marking-definition matching its audience's
//! TLP level. The three marking objects are fixed STIX 2.1 definitions with
//! well-known identifiers; they are referenced, never duplicated, within a
//! bundle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Well-known STIX marking-definition identifier for TLP:CLEAR.
const TLP_CLEAR_MARKING_ID: &str = "marking-definition--613f2e26-407d-48c7-9eca-b8e91df99dc9";
/// Well-known STIX marking-definition identifier for TLP:AMBER.
const TLP_AMBER_MARKING_ID: &str = "marking-definition--f88d31f6-486f-44da-b317-01333bde0b82";
/// Well-known STIX marking-definition identifier for TLP:RED.
const TLP_RED_MARKING_ID: &str = "marking-definition--5e57c739-391a-4eb3-b6be-7d15ca92d5ed";
/// Creation timestamp carried by the fixed STIX TLP marking objects.
const TLP_MARKING_CREATED: &str = "2017-01-20T00:00:00.000Z";

// ============================================================================
// SECTION: TLP Levels
// ============================================================================

/// Traffic Light Protocol sharing-sensitivity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlpLevel {
    /// Public disclosure permitted.
    Clear,
    /// Limited disclosure to participants and partners.
    Amber,
    /// Restricted to internal recipients only.
    Red,
}

impl TlpLevel {
    /// Parses a TLP level from its lowercase string form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clear" => Some(Self::Clear),
            "amber" => Some(Self::Amber),
            "red" => Some(Self::Red),
            _ => None,
        }
    }

    /// Returns the lowercase string form of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Amber => "amber",
            Self::Red => "red",
        }
    }

    /// Returns the well-known STIX marking-definition identifier for the level.
    #[must_use]
    pub const fn marking_definition_id(self) -> &'static str {
        match self {
            Self::Clear => TLP_CLEAR_MARKING_ID,
            Self::Amber => TLP_AMBER_MARKING_ID,
            Self::Red => TLP_RED_MARKING_ID,
        }
    }
}

// ============================================================================
// SECTION: Marking Definitions
// ============================================================================

/// STIX marking-definition object for a TLP level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkingDefinition {
    /// TLP level encoded by this marking.
    level: TlpLevel,
}

impl MarkingDefinition {
    /// Returns the marking-definition for the given TLP level.
    #[must_use]
    pub const fn for_level(level: TlpLevel) -> Self {
        Self {
            level,
        }
    }

    /// Returns the TLP level encoded by this marking.
    #[must_use]
    pub const fn level(self) -> TlpLevel {
        self.level
    }

    /// Serializes the marking into its STIX 2.1 object layout.
    #[must_use]
    pub fn to_stix(self) -> Value {
        json!({
            "type": "marking-definition",
            "spec_version": "2.1",
            "id": self.level.marking_definition_id(),
            "created": TLP_MARKING_CREATED,
            "definition_type": "tlp",
            "definition": { "tlp": self.level.as_str() },
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
