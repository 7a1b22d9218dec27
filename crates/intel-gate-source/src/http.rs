// crates/intel-gate-source/src/http.rs
// ============================================================================
// Module: GraphQL Source Client
// Description: Blocking GraphQL client for the upstream intelligence platform.
// Purpose: Fetch reports, observables, and indicators with strict limits.
// Dependencies: intel-gate-config, intel-gate-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The HTTP client issues bounded GraphQL POST requests against the
//! platform's `/graphql` endpoint with bearer authentication. Redirects are
//! disabled and response bodies are size-limited. Individual malformed nodes
//! in an otherwise valid response are dropped; a transport failure, a non-2xx
//! status, or a GraphQL-level error fails the whole fetch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Read;
use std::time::Duration;

use intel_gate_config::SourceConfig;
use intel_gate_core::ExternalReference;
use intel_gate_core::IndicatorObject;
use intel_gate_core::IntelObject;
use intel_gate_core::ObservableObject;
use intel_gate_core::ReportObject;
use intel_gate_core::identifiers::ObjectId;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::client::SourceClient;
use crate::client::SourceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// User agent for outbound platform requests.
const USER_AGENT: &str = "intel-gate/0.1";
/// Default confidence assigned to observables without an upstream score.
const DEFAULT_OBSERVABLE_CONFIDENCE: u8 = 50;

/// GraphQL query for reports within a creation window.
const REPORTS_QUERY: &str = r"
query Reports($filters: FilterGroup, $first: Int!) {
  reports(filters: $filters, first: $first, orderBy: created_at, orderMode: desc) {
    edges {
      node {
        standard_id
        name
        description
        created_at
        confidence
        report_types
        objectLabel { value }
        createdBy { standard_id }
        externalReferences { edges { node { source_name url description } } }
      }
    }
  }
}
";

/// GraphQL query for observables within a creation window.
const OBSERVABLES_QUERY: &str = r"
query Observables($filters: FilterGroup, $first: Int!) {
  stixCyberObservables(filters: $filters, first: $first, orderBy: created_at, orderMode: desc) {
    edges {
      node {
        standard_id
        observable_value
        entity_type
        created_at
        x_opencti_score
        objectLabel { value }
        createdBy { standard_id }
      }
    }
  }
}
";

/// GraphQL query for indicators within a creation window.
const INDICATORS_QUERY: &str = r"
query Indicators($filters: FilterGroup, $first: Int!) {
  indicators(filters: $filters, first: $first, orderBy: created_at, orderMode: desc) {
    edges {
      node {
        standard_id
        name
        pattern
        created_at
        confidence
        objectLabel { value }
        createdBy { standard_id }
      }
    }
  }
}
";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking GraphQL client for the upstream platform.
pub struct HttpSourceClient {
    /// GraphQL endpoint URL.
    endpoint: Url,
    /// Bearer token for upstream requests.
    api_token: String,
    /// Maximum response size in bytes.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpSourceClient {
    /// Creates a new client from validated source configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the endpoint URL is invalid or the HTTP
    /// client cannot be created.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let base = config.base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/graphql"))
            .map_err(|_| SourceError::Upstream("invalid source base url".to_string()))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|_| SourceError::Upstream("http client build failed".to_string()))?;
        Ok(Self {
            endpoint,
            api_token: config.api_token.clone(),
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Executes a GraphQL query and returns its `data` payload.
    fn graphql(&self, query: &str, variables: Value) -> Result<Value, SourceError> {
        let mut response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .map_err(|err| SourceError::Upstream(format!("graphql request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Upstream(format!("graphql status {status}")));
        }
        let body = read_response_limited(&mut response, self.max_response_bytes)?;
        let payload: Value = serde_json::from_slice(&body)
            .map_err(|err| SourceError::Decode(format!("graphql response not json: {err}")))?;
        if let Some(errors) = payload.get("errors") {
            return Err(SourceError::Upstream(format!("graphql errors: {errors}")));
        }
        payload
            .get("data")
            .cloned()
            .ok_or_else(|| SourceError::Decode("graphql response missing data".to_string()))
    }

    /// Builds the creation-window variables shared by all queries.
    fn window_variables(since: OffsetDateTime, limit: usize) -> Result<Value, SourceError> {
        let since_iso = since
            .format(&Rfc3339)
            .map_err(|_| SourceError::Upstream("invalid fetch window".to_string()))?;
        Ok(json!({
            "filters": {
                "mode": "and",
                "filters": [
                    { "key": "created_at", "values": [since_iso], "operator": "gte" },
                ],
                "filterGroups": [],
            },
            "first": limit,
        }))
    }
}

impl SourceClient for HttpSourceClient {
    fn fetch_reports(
        &self,
        since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError> {
        let data = self.graphql(REPORTS_QUERY, Self::window_variables(since, limit)?)?;
        let nodes = edge_nodes(&data, "reports")?;
        Ok(nodes.iter().filter_map(|node| parse_report(node)).collect())
    }

    fn fetch_observables(
        &self,
        since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError> {
        let data = self.graphql(OBSERVABLES_QUERY, Self::window_variables(since, limit)?)?;
        let nodes = edge_nodes(&data, "stixCyberObservables")?;
        Ok(nodes.iter().filter_map(|node| parse_observable(node)).collect())
    }

    fn fetch_indicators(
        &self,
        since: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<IntelObject>, SourceError> {
        let data = self.graphql(INDICATORS_QUERY, Self::window_variables(since, limit)?)?;
        let nodes = edge_nodes(&data, "indicators")?;
        Ok(nodes.iter().filter_map(|node| parse_indicator(node)).collect())
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Extracts connection edge nodes from a GraphQL data payload.
fn edge_nodes<'a>(data: &'a Value, field: &str) -> Result<Vec<&'a Value>, SourceError> {
    let edges = data
        .get(field)
        .and_then(|connection| connection.get("edges"))
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Decode(format!("missing {field}.edges in response")))?;
    Ok(edges.iter().filter_map(|edge| edge.get("node")).collect())
}

/// Parses one report node; returns `None` when required fields are absent.
fn parse_report(node: &Value) -> Option<IntelObject> {
    let id = node.get("standard_id")?.as_str()?;
    let name = node.get("name")?.as_str()?;
    let created_at = node.get("created_at")?.as_str()?;
    Some(IntelObject::Report(ReportObject {
        id: ObjectId::new(id),
        name: name.to_string(),
        description: node.get("description").and_then(Value::as_str).map(ToString::to_string),
        report_types: string_array(node.get("report_types")),
        labels: parse_labels(node),
        confidence: parse_confidence(node.get("confidence")),
        created_at: created_at.to_string(),
        owner_ref: parse_owner_ref(node),
        external_references: parse_external_references(node),
        provenance: None,
    }))
}

/// Parses one observable node; returns `None` when required fields are absent.
fn parse_observable(node: &Value) -> Option<IntelObject> {
    let id = node.get("standard_id")?.as_str()?;
    let value = node.get("observable_value")?.as_str()?;
    let created_at = node.get("created_at")?.as_str()?;
    Some(IntelObject::Observable(ObservableObject {
        id: ObjectId::new(id),
        value: value.to_string(),
        observable_type: node
            .get("entity_type")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        labels: parse_labels(node),
        confidence: parse_confidence(node.get("x_opencti_score")),
        created_at: created_at.to_string(),
        owner_ref: parse_owner_ref(node),
        external_references: Vec::new(),
        provenance: None,
    }))
}

/// Parses one indicator node; returns `None` when required fields are absent.
fn parse_indicator(node: &Value) -> Option<IntelObject> {
    let id = node.get("standard_id")?.as_str()?;
    let name = node.get("name")?.as_str()?;
    let pattern = node.get("pattern")?.as_str()?;
    let created_at = node.get("created_at")?.as_str()?;
    Some(IntelObject::Indicator(IndicatorObject {
        id: ObjectId::new(id),
        name: name.to_string(),
        pattern: pattern.to_string(),
        labels: parse_labels(node),
        confidence: parse_confidence(node.get("confidence")),
        created_at: created_at.to_string(),
        owner_ref: parse_owner_ref(node),
        external_references: Vec::new(),
        provenance: None,
    }))
}

/// Parses `objectLabel` entries into a label set.
fn parse_labels(node: &Value) -> BTreeSet<String> {
    node.get("objectLabel")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|label| label.get("value").and_then(Value::as_str))
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses an optional JSON array of strings, defaulting to empty.
fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses the creator reference when present.
fn parse_owner_ref(node: &Value) -> Option<String> {
    node.get("createdBy")
        .and_then(|creator| creator.get("standard_id"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Parses external reference edges when present.
fn parse_external_references(node: &Value) -> Vec<ExternalReference> {
    let Some(edges) = node
        .get("externalReferences")
        .and_then(|refs| refs.get("edges"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    edges
        .iter()
        .filter_map(|edge| edge.get("node"))
        .filter_map(|entry| {
            let source_name = entry.get("source_name")?.as_str()?;
            Some(ExternalReference {
                source_name: source_name.to_string(),
                url: entry.get("url").and_then(Value::as_str).map(ToString::to_string),
                description: entry
                    .get("description")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
            })
        })
        .collect()
}

/// Clamps an upstream score into the 0-100 confidence range.
fn parse_confidence(value: Option<&Value>) -> u8 {
    value.and_then(Value::as_i64).map_or(DEFAULT_OBSERVABLE_CONFIDENCE, |score| {
        u8::try_from(score.clamp(0, 100)).unwrap_or(DEFAULT_OBSERVABLE_CONFIDENCE)
    })
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, SourceError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| SourceError::Upstream("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(SourceError::Upstream("graphql response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|_| SourceError::Upstream("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(SourceError::Upstream("graphql response exceeds size limit".to_string()));
    }
    Ok(buf)
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
        reason = "Test-only parsing assertions."
    )]

    use serde_json::json;

    use super::edge_nodes;
    use super::parse_confidence;
    use super::parse_observable;
    use super::parse_report;
    use intel_gate_core::IntelObject;

    #[test]
    fn parse_report_maps_upstream_fields() {
        let node = json!({
            "standard_id": "report--3f6a",
            "name": "Botnet infrastructure update",
            "description": "Tracking update",
            "created_at": "2026-08-10T12:00:00Z",
            "confidence": 80,
            "report_types": ["threat-report"],
            "objectLabel": [{ "value": "osint" }, { "value": "internal:case-7" }],
            "createdBy": { "standard_id": "identity--soc" },
            "externalReferences": {
                "edges": [
                    { "node": { "source_name": "tracker", "url": "https://t.example/1" } }
                ]
            },
        });
        let Some(IntelObject::Report(report)) = parse_report(&node) else {
            panic!("expected report");
        };
        assert_eq!(report.id.as_str(), "report--3f6a");
        assert_eq!(report.confidence, 80);
        assert_eq!(report.labels.len(), 2);
        assert_eq!(report.owner_ref.as_deref(), Some("identity--soc"));
        assert_eq!(report.external_references.len(), 1);
    }

    #[test]
    fn parse_report_skips_node_without_name() {
        let node = json!({
            "standard_id": "report--3f6a",
            "created_at": "2026-08-10T12:00:00Z",
        });
        assert!(parse_report(&node).is_none());
    }

    #[test]
    fn parse_observable_defaults_missing_score() {
        let node = json!({
            "standard_id": "ipv4-addr--9c2b",
            "observable_value": "203.0.113.9",
            "entity_type": "IPv4-Addr",
            "created_at": "2026-08-10T12:00:00Z",
            "x_opencti_score": null,
        });
        let Some(IntelObject::Observable(observable)) = parse_observable(&node) else {
            panic!("expected observable");
        };
        assert_eq!(observable.confidence, 50);
        assert_eq!(observable.observable_type, "IPv4-Addr");
    }

    #[test]
    fn parse_confidence_clamps_out_of_range_scores() {
        assert_eq!(parse_confidence(Some(&json!(250))), 100);
        assert_eq!(parse_confidence(Some(&json!(-5))), 0);
        assert_eq!(parse_confidence(Some(&json!(70))), 70);
    }

    #[test]
    fn edge_nodes_requires_connection_shape() {
        let data = json!({ "reports": { "edges": [ { "node": {} } ] } });
        assert_eq!(edge_nodes(&data, "reports").unwrap().len(), 1);
        assert!(edge_nodes(&data, "indicators").is_err());
    }
}
