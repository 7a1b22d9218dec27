// crates/intel-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs, tooling, and tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Intel Gate configuration. The output is
//! deterministic and must always pass validation.

/// Returns a canonical example `intel-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[export]
share_dir = "/var/lib/intel-gate/share"
interval_secs = 300
lookback_days = 30
fetch_limit = 1000

[source]
base_url = "https://opencti.example.net"
api_token = "replace-with-platform-token"
connect_timeout_ms = 1000
request_timeout_ms = 15000
# allow_http = false

[gateway]
bind = "127.0.0.1:8443"

[keys]
internal_keys = ["internal-key-soc"]

[keys.partner_keys]
fin-isac = "partner-key-fin-isac"

[[audiences]]
id = "public"
tlp = "clear"
auth_tier = "none"
include_reports = true
max_reports = 50
allowed_labels = ["osint"]
min_confidence = 60
sanitize = true

[[audiences]]
id = "fin-isac"
tlp = "amber"
auth_tier = "partner_key"
include_reports = true
include_high_confidence_iocs = true
max_reports = 200
allowed_labels = ["osint", "otx", "honeypot"]
sanitize = true

[[audiences]]
id = "internal"
tlp = "red"
auth_tier = "internal_key"
include_reports = true
include_high_confidence_iocs = true
sanitize = false
"#,
    )
}
