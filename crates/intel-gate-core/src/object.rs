// crates/intel-gate-core/src/object.rs
// ============================================================================
// Module: Intelligence Object Model
// Description: Typed report, observable, and indicator objects with STIX serializers.
// Purpose: Represent upstream intelligence as a closed set of tagged variants.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Intelligence objects are transient, read-only snapshots fetched once per
//! export cycle. They are modeled as a closed enum rather than untyped JSON
//! maps: each variant carries its own fields and an explicit serializer
//! producing the STIX 2.1 field layout. Restricted fields (owner reference,
//! external references, provenance) live on every variant so the sanitizer
//! can strip them uniformly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::identifiers::ObjectId;

// ============================================================================
// SECTION: Object Errors
// ============================================================================

/// Validation errors for malformed intelligence objects.
///
/// A malformed object is skipped and logged during bundle construction; it
/// never aborts the audience or the cycle.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Object identifier is empty.
    #[error("object id is empty")]
    EmptyId,
    /// Object identifier does not follow the `type--uuid` form.
    #[error("object id is not in type--uuid form: {0}")]
    BadIdFormat(String),
    /// Confidence is outside the 0-100 range.
    #[error("confidence out of range: {0}")]
    ConfidenceOutOfRange(u8),
    /// Creation timestamp is not valid RFC 3339.
    #[error("invalid created_at timestamp: {0}")]
    BadTimestamp(String),
}

// ============================================================================
// SECTION: Shared Attributes
// ============================================================================

/// External reference attached to an intelligence object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReference {
    /// Source name for the reference.
    pub source_name: String,
    /// Optional URL for the reference.
    #[serde(default)]
    pub url: Option<String>,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Connector and enrichment provenance attached by upstream pipelines.
///
/// Provenance is internal-only material: it reveals which collector produced
/// an object and how it was scored, and is always removed by sanitization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Name of the connector that produced the object.
    pub connector: String,
    /// Enrichment annotations keyed by enricher name.
    #[serde(default)]
    pub enrichment: BTreeMap<String, String>,
    /// Scoring trace explaining how confidence was derived.
    #[serde(default)]
    pub score_trace: Option<String>,
}

/// Object kinds in the dissemination data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Finished intelligence report.
    Report,
    /// Raw observable value (hash, IP, domain, URL).
    Observable,
    /// Detection indicator with a STIX pattern.
    Indicator,
}

impl ObjectKind {
    /// Returns the lowercase string form of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Observable => "observable",
            Self::Indicator => "indicator",
        }
    }
}

// ============================================================================
// SECTION: Object Variants
// ============================================================================

/// Finished intelligence report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportObject {
    /// Object identifier in `report--uuid` form.
    pub id: ObjectId,
    /// Report title.
    pub name: String,
    /// Optional report body or summary.
    #[serde(default)]
    pub description: Option<String>,
    /// Report type labels (e.g. `threat-report`).
    #[serde(default)]
    pub report_types: Vec<String>,
    /// Classification labels.
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Confidence score, 0-100.
    pub confidence: u8,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
    /// Owning organization reference. Restricted field.
    #[serde(default)]
    pub owner_ref: Option<String>,
    /// External references. Restricted field.
    #[serde(default)]
    pub external_references: Vec<ExternalReference>,
    /// Connector and enrichment provenance. Restricted field.
    #[serde(default)]
    pub provenance: Option<Provenance>,
}

/// Raw observable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservableObject {
    /// Object identifier in `observable--uuid` form.
    pub id: ObjectId,
    /// Observable value (hash, IP, domain, URL).
    pub value: String,
    /// Upstream entity type for the observable (e.g. `IPv4-Addr`).
    pub observable_type: String,
    /// Classification labels.
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Confidence score, 0-100.
    pub confidence: u8,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
    /// Owning organization reference. Restricted field.
    #[serde(default)]
    pub owner_ref: Option<String>,
    /// External references. Restricted field.
    #[serde(default)]
    pub external_references: Vec<ExternalReference>,
    /// Connector and enrichment provenance. Restricted field.
    #[serde(default)]
    pub provenance: Option<Provenance>,
}

/// Detection indicator with a STIX pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorObject {
    /// Object identifier in `indicator--uuid` form.
    pub id: ObjectId,
    /// Indicator name.
    pub name: String,
    /// STIX pattern expression.
    pub pattern: String,
    /// Classification labels.
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Confidence score, 0-100.
    pub confidence: u8,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
    /// Owning organization reference. Restricted field.
    #[serde(default)]
    pub owner_ref: Option<String>,
    /// External references. Restricted field.
    #[serde(default)]
    pub external_references: Vec<ExternalReference>,
    /// Connector and enrichment provenance. Restricted field.
    #[serde(default)]
    pub provenance: Option<Provenance>,
}

/// Intelligence object variants consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntelObject {
    /// Finished intelligence report.
    Report(ReportObject),
    /// Raw observable value.
    Observable(ObservableObject),
    /// Detection indicator.
    Indicator(IndicatorObject),
}

impl IntelObject {
    /// Returns the object kind.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Report(_) => ObjectKind::Report,
            Self::Observable(_) => ObjectKind::Observable,
            Self::Indicator(_) => ObjectKind::Indicator,
        }
    }

    /// Returns the object identifier.
    #[must_use]
    pub const fn id(&self) -> &ObjectId {
        match self {
            Self::Report(report) => &report.id,
            Self::Observable(observable) => &observable.id,
            Self::Indicator(indicator) => &indicator.id,
        }
    }

    /// Returns the classification labels.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        match self {
            Self::Report(report) => &report.labels,
            Self::Observable(observable) => &observable.labels,
            Self::Indicator(indicator) => &indicator.labels,
        }
    }

    /// Returns the confidence score.
    #[must_use]
    pub const fn confidence(&self) -> u8 {
        match self {
            Self::Report(report) => report.confidence,
            Self::Observable(observable) => observable.confidence,
            Self::Indicator(indicator) => indicator.confidence,
        }
    }

    /// Returns the creation timestamp string.
    #[must_use]
    pub fn created_at(&self) -> &str {
        match self {
            Self::Report(report) => &report.created_at,
            Self::Observable(observable) => &observable.created_at,
            Self::Indicator(indicator) => &indicator.created_at,
        }
    }

    /// Returns the owner reference when present.
    #[must_use]
    pub const fn owner_ref(&self) -> Option<&String> {
        match self {
            Self::Report(report) => report.owner_ref.as_ref(),
            Self::Observable(observable) => observable.owner_ref.as_ref(),
            Self::Indicator(indicator) => indicator.owner_ref.as_ref(),
        }
    }

    /// Returns the external references.
    #[must_use]
    pub fn external_references(&self) -> &[ExternalReference] {
        match self {
            Self::Report(report) => &report.external_references,
            Self::Observable(observable) => &observable.external_references,
            Self::Indicator(indicator) => &indicator.external_references,
        }
    }

    /// Returns the provenance record when present.
    #[must_use]
    pub const fn provenance(&self) -> Option<&Provenance> {
        match self {
            Self::Report(report) => report.provenance.as_ref(),
            Self::Observable(observable) => observable.provenance.as_ref(),
            Self::Indicator(indicator) => indicator.provenance.as_ref(),
        }
    }

    /// Validates structural invariants required for publication.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectError`] when the object is malformed and must be
    /// skipped.
    pub fn validate(&self) -> Result<(), ObjectError> {
        let id = self.id().as_str();
        if id.is_empty() {
            return Err(ObjectError::EmptyId);
        }
        if !id.contains("--") {
            return Err(ObjectError::BadIdFormat(id.to_string()));
        }
        if self.confidence() > 100 {
            return Err(ObjectError::ConfidenceOutOfRange(self.confidence()));
        }
        if OffsetDateTime::parse(self.created_at(), &Rfc3339).is_err() {
            return Err(ObjectError::BadTimestamp(self.created_at().to_string()));
        }
        Ok(())
    }

    /// Serializes the object into its STIX 2.1 field layout.
    ///
    /// Restricted fields are serialized when present; the sanitizer removes
    /// them before this point for sanitizing audiences.
    #[must_use]
    pub fn to_stix(&self) -> Value {
        let mut stix = match self {
            Self::Report(report) => json!({
                "type": "report",
                "spec_version": "2.1",
                "id": report.id.as_str(),
                "name": report.name,
                "published": report.created_at,
                "created": report.created_at,
                "report_types": report.report_types,
            }),
            Self::Observable(observable) => json!({
                "type": "indicator",
                "spec_version": "2.1",
                "id": indicator_id_for(observable.id.as_str()),
                "name": format!("IOC {}", observable.value),
                "pattern": format!("[x-opencti:value = '{}']", observable.value),
                "created": observable.created_at,
                "x_observable_type": observable.observable_type,
            }),
            Self::Indicator(indicator) => json!({
                "type": "indicator",
                "spec_version": "2.1",
                "id": indicator.id.as_str(),
                "name": indicator.name,
                "pattern": indicator.pattern,
                "created": indicator.created_at,
            }),
        };
        self.append_common_fields(&mut stix);
        stix
    }

    /// Appends shared and restricted fields to a serialized object.
    fn append_common_fields(&self, stix: &mut Value) {
        let Some(map) = stix.as_object_mut() else {
            return;
        };
        map.insert("confidence".to_string(), json!(self.confidence()));
        if !self.labels().is_empty() {
            map.insert("labels".to_string(), json!(self.labels()));
        }
        if let Self::Report(report) = self
            && let Some(description) = &report.description
        {
            map.insert("description".to_string(), json!(description));
        }
        if let Some(owner_ref) = self.owner_ref() {
            map.insert("x_owner_ref".to_string(), json!(owner_ref));
        }
        if !self.external_references().is_empty() {
            map.insert("external_references".to_string(), json!(self.external_references()));
        }
        if let Some(provenance) = self.provenance() {
            map.insert("x_provenance".to_string(), json!(provenance));
        }
    }
}

/// Derives an `indicator--` identifier for an indicator synthesized from an
/// observable, keeping the upstream identifier's unique suffix so the STIX
/// id prefix matches the emitted object type.
fn indicator_id_for(observable_id: &str) -> String {
    match observable_id.split_once("--") {
        Some((_, suffix)) => format!("indicator--{suffix}"),
        None => format!("indicator--{observable_id}"),
    }
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
        reason = "Test-only object assertions."
    )]

    use std::collections::BTreeSet;

    use super::IntelObject;
    use super::ObjectKind;
    use super::ObservableObject;
    use super::ReportObject;
    use crate::identifiers::ObjectId;

    fn report(id: &str, confidence: u8, created_at: &str) -> IntelObject {
        IntelObject::Report(ReportObject {
            id: ObjectId::new(id),
            name: "Campaign update".to_string(),
            description: None,
            report_types: vec!["threat-report".to_string()],
            labels: BTreeSet::new(),
            confidence,
            created_at: created_at.to_string(),
            owner_ref: None,
            external_references: Vec::new(),
            provenance: None,
        })
    }

    #[test]
    fn validate_accepts_well_formed_object() {
        let object = report("report--0001", 70, "2026-08-01T00:00:00Z");
        assert!(object.validate().is_ok());
        assert_eq!(object.kind(), ObjectKind::Report);
    }

    #[test]
    fn validate_rejects_bad_id_and_timestamp() {
        assert!(report("", 70, "2026-08-01T00:00:00Z").validate().is_err());
        assert!(report("report-0001", 70, "2026-08-01T00:00:00Z").validate().is_err());
        assert!(report("report--0001", 70, "yesterday").validate().is_err());
        assert!(report("report--0001", 101, "2026-08-01T00:00:00Z").validate().is_err());
    }

    #[test]
    fn report_serializes_stix_layout() {
        let stix = report("report--0001", 70, "2026-08-01T00:00:00Z").to_stix();
        assert_eq!(stix["type"], "report");
        assert_eq!(stix["spec_version"], "2.1");
        assert_eq!(stix["confidence"], 70);
        assert!(stix.get("x_owner_ref").is_none());
    }

    #[test]
    fn observable_serializes_as_indicator_with_matching_id_prefix() {
        let object = IntelObject::Observable(ObservableObject {
            id: ObjectId::new("ipv4-addr--9c2b"),
            value: "203.0.113.9".to_string(),
            observable_type: "IPv4-Addr".to_string(),
            labels: BTreeSet::new(),
            confidence: 60,
            created_at: "2026-08-01T00:00:00Z".to_string(),
            owner_ref: None,
            external_references: Vec::new(),
            provenance: None,
        });
        let stix = object.to_stix();
        assert_eq!(stix["type"], "indicator");
        assert_eq!(stix["id"], "indicator--9c2b");
        assert_eq!(stix["pattern"], "[x-opencti:value = '203.0.113.9']");
        assert_eq!(stix["x_observable_type"], "IPv4-Addr");
    }
}
