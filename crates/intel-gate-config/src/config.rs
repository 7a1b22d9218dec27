// crates/intel-gate-config/src/config.rs
// ============================================================================
// Module: Intel Gate Configuration
// Description: Configuration loading and validation for Intel Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: the process refuses to
//! start rather than exporting or serving with a partial policy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "intel-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "INTEL_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured API keys per tier.
pub(crate) const MAX_API_KEYS: usize = 64;
/// Maximum length of an API key.
pub(crate) const MAX_API_KEY_LENGTH: usize = 256;
/// Maximum number of configured audiences.
pub(crate) const MAX_AUDIENCES: usize = 128;
/// Maximum number of allowed labels per audience.
pub(crate) const MAX_AUDIENCE_LABELS: usize = 64;
/// Minimum export interval in seconds.
pub(crate) const MIN_EXPORT_INTERVAL_SECS: u64 = 10;
/// Maximum export interval in seconds.
pub(crate) const MAX_EXPORT_INTERVAL_SECS: u64 = 86_400;
/// Default export interval in seconds.
const DEFAULT_EXPORT_INTERVAL_SECS: u64 = 300;
/// Minimum lookback window in days.
pub(crate) const MIN_LOOKBACK_DAYS: u32 = 1;
/// Maximum lookback window in days.
pub(crate) const MAX_LOOKBACK_DAYS: u32 = 365;
/// Default lookback window in days.
const DEFAULT_LOOKBACK_DAYS: u32 = 30;
/// Maximum objects fetched per kind per cycle.
pub(crate) const MAX_FETCH_LIMIT: usize = 100_000;
/// Default objects fetched per kind per cycle.
const DEFAULT_FETCH_LIMIT: usize = 1_000;
/// Minimum upstream connect timeout in milliseconds.
pub(crate) const MIN_SOURCE_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum upstream connect timeout in milliseconds.
pub(crate) const MAX_SOURCE_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum upstream request timeout in milliseconds.
pub(crate) const MIN_SOURCE_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum upstream request timeout in milliseconds.
pub(crate) const MAX_SOURCE_REQUEST_TIMEOUT_MS: u64 = 60_000;
/// Default upstream connect timeout in milliseconds.
const DEFAULT_SOURCE_CONNECT_TIMEOUT_MS: u64 = 1_000;
/// Default upstream request timeout in milliseconds.
const DEFAULT_SOURCE_REQUEST_TIMEOUT_MS: u64 = 15_000;
/// Default maximum upstream response size in bytes.
const DEFAULT_SOURCE_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Maximum allowed upstream response size in bytes.
pub(crate) const MAX_SOURCE_MAX_RESPONSE_BYTES: usize = 256 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Intel Gate pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IntelGateConfig {
    /// Export orchestrator configuration.
    pub export: ExportConfig,
    /// Upstream intelligence source configuration.
    pub source: SourceConfig,
    /// Serving gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// API key configuration for gated tiers.
    #[serde(default)]
    pub keys: KeysConfig,
    /// Audience policy entries.
    #[serde(default)]
    pub audiences: Vec<AudienceConfig>,
}

impl IntelGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.export.validate()?;
        self.source.validate()?;
        self.gateway.validate()?;
        self.keys.validate()?;
        if self.audiences.is_empty() {
            return Err(ConfigError::Invalid("at least one audience is required".to_string()));
        }
        if self.audiences.len() > MAX_AUDIENCES {
            return Err(ConfigError::Invalid("too many audiences".to_string()));
        }
        Ok(())
    }
}

/// Export orchestrator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Root directory of the published share tree.
    pub share_dir: PathBuf,
    /// Seconds between export cycles.
    #[serde(default = "default_export_interval_secs")]
    pub interval_secs: u64,
    /// Lookback window in days for fetched objects.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Maximum objects fetched per kind per cycle.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

impl ExportConfig {
    /// Validates export settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("export.share_dir", &self.share_dir.to_string_lossy())?;
        if self.interval_secs < MIN_EXPORT_INTERVAL_SECS
            || self.interval_secs > MAX_EXPORT_INTERVAL_SECS
        {
            return Err(ConfigError::Invalid(format!(
                "export.interval_secs must be between {MIN_EXPORT_INTERVAL_SECS} and \
                 {MAX_EXPORT_INTERVAL_SECS}",
            )));
        }
        if self.lookback_days < MIN_LOOKBACK_DAYS || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid(format!(
                "export.lookback_days must be between {MIN_LOOKBACK_DAYS} and {MAX_LOOKBACK_DAYS}",
            )));
        }
        if self.fetch_limit == 0 || self.fetch_limit > MAX_FETCH_LIMIT {
            return Err(ConfigError::Invalid("export.fetch_limit out of range".to_string()));
        }
        Ok(())
    }
}

/// Upstream intelligence source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the upstream intelligence platform.
    pub base_url: String,
    /// Bearer token for upstream requests.
    pub api_token: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_source_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_source_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum upstream response size in bytes.
    #[serde(default = "default_source_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Allow non-TLS base URLs (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl SourceConfig {
    /// Validates upstream source settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("source.base_url is required".to_string()));
        }
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "source.base_url must include http:// or https://".to_string(),
            ));
        }
        if trimmed.starts_with("http://") && !self.allow_http {
            return Err(ConfigError::Invalid(
                "source.base_url uses http:// without allow_http".to_string(),
            ));
        }
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::Invalid("source.api_token is required".to_string()));
        }
        validate_timeout_range(
            "source.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_SOURCE_CONNECT_TIMEOUT_MS,
            MAX_SOURCE_CONNECT_TIMEOUT_MS,
        )?;
        validate_timeout_range(
            "source.request_timeout_ms",
            self.request_timeout_ms,
            MIN_SOURCE_REQUEST_TIMEOUT_MS,
            MAX_SOURCE_REQUEST_TIMEOUT_MS,
        )?;
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_SOURCE_MAX_RESPONSE_BYTES
        {
            return Err(ConfigError::Invalid(
                "source.max_response_bytes out of range".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serving gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Bind address for the HTTP gateway.
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
        }
    }
}

impl GatewayConfig {
    /// Validates gateway settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let bind = self.bind.trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("gateway.bind is required".to_string()));
        }
        let _: SocketAddr = bind
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid gateway bind address".to_string()))?;
        Ok(())
    }
}

/// API key configuration for gated tiers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysConfig {
    /// Partner keys keyed by audience identifier.
    #[serde(default)]
    pub partner_keys: BTreeMap<String, String>,
    /// Accepted internal keys.
    #[serde(default)]
    pub internal_keys: Vec<String>,
}

impl KeysConfig {
    /// Validates key material constraints.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.partner_keys.len() > MAX_API_KEYS {
            return Err(ConfigError::Invalid("too many partner keys".to_string()));
        }
        if self.internal_keys.len() > MAX_API_KEYS {
            return Err(ConfigError::Invalid("too many internal keys".to_string()));
        }
        for key in self.partner_keys.values().chain(self.internal_keys.iter()) {
            validate_api_key(key)?;
        }
        Ok(())
    }
}

/// Raw audience policy entry prior to compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct AudienceConfig {
    /// Audience identifier; also a share tree path segment.
    pub id: String,
    /// TLP level name: `clear`, `amber`, or `red`.
    pub tlp: String,
    /// Authorization tier name: `none`, `partner_key`, or `internal_key`.
    pub auth_tier: String,
    /// Include report objects in published artifacts.
    #[serde(default = "default_true")]
    pub include_reports: bool,
    /// Publish the high-confidence IOC artifact.
    #[serde(default)]
    pub include_high_confidence_iocs: bool,
    /// Cap on report objects per bundle.
    #[serde(default)]
    pub max_reports: Option<i64>,
    /// Cap on observable objects per bundle.
    #[serde(default)]
    pub max_observables: Option<i64>,
    /// Label filter; empty disables label filtering.
    #[serde(default)]
    pub allowed_labels: Vec<String>,
    /// Minimum confidence for inclusion.
    #[serde(default)]
    pub min_confidence: Option<i64>,
    /// Strip restricted fields from published objects.
    #[serde(default = "default_true")]
    pub sanitize: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a timeout value against a millisecond range.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Validates a single API key value.
fn validate_api_key(key: &str) -> Result<(), ConfigError> {
    if key.trim().is_empty() {
        return Err(ConfigError::Invalid("api key must be non-empty".to_string()));
    }
    if key.len() > MAX_API_KEY_LENGTH {
        return Err(ConfigError::Invalid("api key too long".to_string()));
    }
    if key.trim() != key || key.contains(char::is_whitespace) {
        return Err(ConfigError::Invalid("api key must not contain whitespace".to_string()));
    }
    Ok(())
}

/// Default export interval in seconds.
const fn default_export_interval_secs() -> u64 {
    DEFAULT_EXPORT_INTERVAL_SECS
}

/// Default lookback window in days.
const fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

/// Default fetch limit per kind.
const fn default_fetch_limit() -> usize {
    DEFAULT_FETCH_LIMIT
}

/// Default upstream connect timeout in milliseconds.
const fn default_source_connect_timeout_ms() -> u64 {
    DEFAULT_SOURCE_CONNECT_TIMEOUT_MS
}

/// Default upstream request timeout in milliseconds.
const fn default_source_request_timeout_ms() -> u64 {
    DEFAULT_SOURCE_REQUEST_TIMEOUT_MS
}

/// Default maximum upstream response size in bytes.
const fn default_source_max_response_bytes() -> usize {
    DEFAULT_SOURCE_MAX_RESPONSE_BYTES
}

/// Default gateway bind address.
fn default_gateway_bind() -> String {
    "127.0.0.1:8443".to_string()
}

/// Serde default helper for opt-out booleans.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
