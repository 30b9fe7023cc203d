// pm-provisioning-config/src/config.rs
// ============================================================================
// Module: PM Provisioning Configuration
// Description: Configuration loading and validation for PM provisioning.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: pm-provisioning-core, pm-provisioning-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid configuration that
//! runs with in-memory state, 32-character aliases, and a 15 minute default
//! aggregation period. Missing or invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use pm_provisioning_core::AggregationPeriod;
use pm_provisioning_core::AliasPolicy;
use pm_provisioning_core::DEFAULT_HASH_ALGORITHM;
use pm_provisioning_core::HashAlgorithm;
use pm_provisioning_core::InMemoryProvisioningStateStore;
use pm_provisioning_core::ResolverConfig;
use pm_provisioning_core::SharedProvisioningStateStore;
use pm_provisioning_core::UuidNameGenerator;
use pm_provisioning_core::runtime::DEFAULT_COMPLEX_EXECUTION_GROUP;
use pm_provisioning_core::runtime::DEFAULT_MAX_ALIAS_LENGTH;
use pm_provisioning_core::runtime::DEFAULT_NAME_PREFIX;
use pm_provisioning_core::runtime::MAX_ALIAS_LENGTH;
use pm_provisioning_core::runtime::MIN_ALIAS_LENGTH;
use pm_provisioning_store_sqlite::SqliteProvisioningStateStore;
use pm_provisioning_store_sqlite::SqliteStoreConfig;
use pm_provisioning_store_sqlite::SqliteStoreMode;
use pm_provisioning_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::augmentation::PlaceholderUrlResolver;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "pm-provisioning.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "PM_PROVISIONING_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum `SQLite` busy timeout in milliseconds.
pub(crate) const MAX_STORE_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum number of augmentation placeholders.
pub(crate) const MAX_PLACEHOLDERS: usize = 256;
/// Maximum length of a placeholder value.
pub(crate) const MAX_PLACEHOLDER_VALUE_LENGTH: usize = 2048;
/// Default tracing filter directive.
pub(crate) const DEFAULT_LOG_FILTER: &str = "pm_provisioning=info";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// PM provisioning configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningConfig {
    /// KPI resolution settings.
    #[serde(default)]
    pub resolution: ResolutionConfig,
    /// Augmentation URL settings.
    #[serde(default)]
    pub augmentation: AugmentationConfig,
    /// Provisioning state store backend.
    #[serde(default)]
    pub provisioning_state_store: ProvisioningStateStoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProvisioningConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is `path` when given, else the `PM_PROVISIONING_CONFIG`
    /// environment variable, else `pm-provisioning.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        check_path_limits("config path", &resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
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
        self.resolution.validate()?;
        self.augmentation.validate()?;
        self.provisioning_state_store.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Converts the resolution section into resolver settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the resolution section is invalid.
    pub fn resolver_config(&self) -> Result<ResolverConfig, ConfigError> {
        self.resolution.resolver_config()
    }

    /// Builds the runtime name generator.
    #[must_use]
    pub fn name_generator(&self) -> UuidNameGenerator {
        UuidNameGenerator::new(self.resolution.name_prefix.clone())
    }

    /// Builds the augmentation URL resolver.
    #[must_use]
    pub fn url_resolver(&self) -> PlaceholderUrlResolver {
        PlaceholderUrlResolver::new(self.augmentation.placeholders.clone())
    }

    /// Builds the configured provisioning state store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the store section is invalid or the
    /// `SQLite` database cannot be opened.
    pub fn build_provisioning_state_store(
        &self,
    ) -> Result<SharedProvisioningStateStore, ConfigError> {
        self.provisioning_state_store.build()
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// KPI resolution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionConfig {
    /// Maximum fact table alias length.
    #[serde(default = "default_max_alias_length")]
    pub max_alias_length: usize,
    /// Period in minutes applied when a KPI reference has no override.
    #[serde(default = "default_aggregation_period")]
    pub default_aggregation_period: Option<u32>,
    /// Execution group stamped on complex KPI definitions.
    #[serde(default = "default_complex_execution_group")]
    pub complex_execution_group: String,
    /// Prefix of generated runtime KPI names.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Digest algorithm for reference fingerprints and alias compression.
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: HashAlgorithm,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_alias_length: default_max_alias_length(),
            default_aggregation_period: default_aggregation_period(),
            complex_execution_group: default_complex_execution_group(),
            name_prefix: default_name_prefix(),
            hash_algorithm: default_hash_algorithm(),
        }
    }
}

impl ResolutionConfig {
    /// Validates resolution settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.resolver_config().map(|_| ())
    }

    /// Converts validated settings into resolver settings.
    fn resolver_config(&self) -> Result<ResolverConfig, ConfigError> {
        let policy = AliasPolicy::new(self.max_alias_length, self.hash_algorithm).map_err(|_| {
            ConfigError::Invalid(format!(
                "resolution.max_alias_length must be between {MIN_ALIAS_LENGTH} and \
                 {MAX_ALIAS_LENGTH}",
            ))
        })?;
        let default_aggregation_period = self
            .default_aggregation_period
            .map(AggregationPeriod::new)
            .transpose()
            .map_err(|_| {
                ConfigError::Invalid(
                    "resolution.default_aggregation_period must be one of 15, 60, 1440"
                        .to_string(),
                )
            })?;
        if self.complex_execution_group.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "resolution.complex_execution_group must be non-empty".to_string(),
            ));
        }
        if !policy.is_valid(&self.name_prefix) {
            return Err(ConfigError::Invalid(format!(
                "resolution.name_prefix must match {}",
                policy.pattern()
            )));
        }
        Ok(ResolverConfig {
            max_alias_length: self.max_alias_length,
            default_aggregation_period,
            complex_execution_group: self.complex_execution_group.clone(),
            hash_algorithm: self.hash_algorithm,
        })
    }
}

// ============================================================================
// SECTION: Augmentation
// ============================================================================

/// Augmentation URL settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AugmentationConfig {
    /// Values substituted for `${NAME}` placeholders.
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
}

impl AugmentationConfig {
    /// Validates placeholder names and values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.placeholders.len() > MAX_PLACEHOLDERS {
            return Err(ConfigError::Invalid(format!(
                "augmentation.placeholders exceeds {MAX_PLACEHOLDERS} entries"
            )));
        }
        for (name, value) in &self.placeholders {
            if !is_placeholder_name(name) {
                return Err(ConfigError::Invalid(format!(
                    "augmentation placeholder name {name} must match [A-Za-z_][A-Za-z0-9_]*"
                )));
            }
            if value.len() > MAX_PLACEHOLDER_VALUE_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "augmentation placeholder {name} value exceeds max length"
                )));
            }
        }
        Ok(())
    }
}

/// Returns true when `name` is a valid placeholder identifier.
fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

// ============================================================================
// SECTION: Provisioning State Store
// ============================================================================

/// Provisioning state store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningStateStoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: ProvisioningStateStoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for ProvisioningStateStoreConfig {
    fn default() -> Self {
        Self {
            store_type: ProvisioningStateStoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl ProvisioningStateStoreConfig {
    /// Validates provisioning state store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            ProvisioningStateStoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory provisioning_state_store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            ProvisioningStateStoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid(
                        "sqlite provisioning_state_store requires path".to_string(),
                    )
                })?;
                validate_store_path(path)?;
                validate_timeout_range(
                    "provisioning_state_store.busy_timeout_ms",
                    self.busy_timeout_ms,
                    0,
                    MAX_STORE_BUSY_TIMEOUT_MS,
                )
            }
        }
    }

    /// Builds the configured store behind a shared wrapper.
    fn build(&self) -> Result<SharedProvisioningStateStore, ConfigError> {
        self.validate()?;
        match (self.store_type, &self.path) {
            (ProvisioningStateStoreType::Sqlite, Some(path)) => {
                let config = SqliteStoreConfig {
                    path: path.clone(),
                    busy_timeout_ms: self.busy_timeout_ms,
                    journal_mode: self.journal_mode,
                    sync_mode: self.sync_mode,
                };
                let store = SqliteProvisioningStateStore::new(&config)
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                info!(
                    backend = "sqlite",
                    path = %path.display(),
                    "provisioning state store opened"
                );
                Ok(SharedProvisioningStateStore::from_store(store))
            }
            _ => {
                info!(backend = "memory", "provisioning state store opened");
                Ok(SharedProvisioningStateStore::from_store(InMemoryProvisioningStateStore::new()))
            }
        }
    }
}

/// Provisioning state store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStateStoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use `SQLite`-backed durable store.
    Sqlite,
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        tracing_subscriber::EnvFilter::try_new(&self.filter)
            .map_err(|err| ConfigError::Invalid(format!("logging.filter is invalid: {err}")))?;
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening a store.
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

/// Resolves the config path from an explicit path or environment defaults.
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

/// Checks `path` against the length limits, naming it `label` in errors.
fn check_path_limits(label: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{label} exceeds max length")));
    }
    if path.components().any(|part| part.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return Err(ConfigError::Invalid(format!("{label} component too long")));
    }
    Ok(())
}

/// Validates the sqlite state database path.
fn validate_store_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "provisioning_state_store path must be non-empty".to_string(),
        ));
    }
    check_path_limits("provisioning_state_store path", path)
}

/// Validates a timeout value against bounds.
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

/// Default maximum alias length.
const fn default_max_alias_length() -> usize {
    DEFAULT_MAX_ALIAS_LENGTH
}

/// Default aggregation period in minutes.
const fn default_aggregation_period() -> Option<u32> {
    Some(AggregationPeriod::QUARTER_HOUR.minutes())
}

/// Default complex execution group.
fn default_complex_execution_group() -> String {
    DEFAULT_COMPLEX_EXECUTION_GROUP.to_string()
}

/// Default runtime name prefix.
fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}

/// Default digest algorithm.
const fn default_hash_algorithm() -> HashAlgorithm {
    DEFAULT_HASH_ALGORITHM
}

/// Default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

/// Default tracing filter directive.
fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
