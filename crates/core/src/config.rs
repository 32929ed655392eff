//! Engine configuration: TOML parsing, `${VAR}` expansion and validation.
//!
//! [`FlowlineConfig`] is the declarative pipeline definition the engine loads
//! at startup. An empty file is a valid no-op pipeline.
//!
//! # Loading order
//! 1. Read the file (a missing file is reported as such, not as a load error)
//! 2. Expand `${VAR}` references from the process environment
//! 3. Parse TOML (unknown fields are rejected)
//! 4. Apply `FLOWLINE_GENERAL_*` environment overrides
//! 5. Validate
//!
//! # Example
//! ```toml
//! [[scrape]]
//! name = "agent_self"
//! targets = ["self"]
//! interval_ms = 100
//! forward_to = ["default"]
//!
//! [[remote_write]]
//! name = "default"
//! endpoint = "${WRITE_ENDPOINT}"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, FlowlineError};

/// Target name that resolves to the engine's own status address.
pub const SELF_TARGET: &str = "self";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowlineConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Scrape components
    #[serde(default)]
    pub scrape: Vec<ScrapeConfig>,
    /// Remote-write components
    #[serde(default)]
    pub remote_write: Vec<RemoteWriteConfig>,
}

impl FlowlineConfig {
    /// Read, expand, parse, override and validate a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FlowlineError> {
        let source = Self::read(path).await?;
        Ok(Self::from_source(&source)?)
    }

    /// Read the raw configuration source.
    ///
    /// A missing file maps to [`ConfigError::FileNotFound`]; other I/O
    /// failures are passed through.
    pub async fn read(path: impl AsRef<Path>) -> Result<String, FlowlineError> {
        let path = path.as_ref();
        tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FlowlineError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                FlowlineError::Io(e)
            }
        })
    }

    /// Build a validated configuration from source text.
    pub fn from_source(source: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env(source)?;
        let mut config = Self::parse(&expanded)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without expansion, overrides or validation.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })
    }

    /// Override general settings from `FLOWLINE_GENERAL_{FIELD}` variables.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "FLOWLINE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "FLOWLINE_GENERAL_LOG_FORMAT");
    }

    /// Validate field values and cross-component references.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        let mut writers = HashSet::new();
        for (i, rw) in self.remote_write.iter().enumerate() {
            check_name(&rw.name, &format!("remote_write[{i}].name"))?;
            if !writers.insert(rw.name.as_str()) {
                return Err(invalid(
                    &format!("remote_write[{i}].name"),
                    format!("duplicate component name '{}'", rw.name),
                ));
            }
            if rw.endpoint.trim().is_empty() {
                return Err(invalid(
                    &format!("remote_write[{i}].endpoint"),
                    "endpoint must not be empty".to_owned(),
                ));
            }
        }

        let mut scrapers = HashSet::new();
        for (i, sc) in self.scrape.iter().enumerate() {
            check_name(&sc.name, &format!("scrape[{i}].name"))?;
            if !scrapers.insert(sc.name.as_str()) {
                return Err(invalid(
                    &format!("scrape[{i}].name"),
                    format!("duplicate component name '{}'", sc.name),
                ));
            }
            if sc.targets.is_empty() {
                return Err(invalid(
                    &format!("scrape[{i}].targets"),
                    "at least one target is required".to_owned(),
                ));
            }
            if sc.interval_ms == 0 {
                return Err(invalid(
                    &format!("scrape[{i}].interval_ms"),
                    "must be greater than zero".to_owned(),
                ));
            }
            if sc.timeout_ms == 0 {
                return Err(invalid(
                    &format!("scrape[{i}].timeout_ms"),
                    "must be greater than zero".to_owned(),
                ));
            }
            for receiver in &sc.forward_to {
                if !writers.contains(receiver.as_str()) {
                    return Err(invalid(
                        &format!("scrape[{i}].forward_to"),
                        format!("unknown remote_write component '{receiver}'"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Number of components the engine will run, excluding the status server.
    pub fn component_count(&self) -> usize {
        self.scrape.len() + self.remote_write.len()
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// A scrape component: periodically pulls Prometheus text exposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeConfig {
    /// Component name, unique among scrape components
    pub name: String,
    /// `host:port` addresses, or `"self"` for the engine's status surface
    pub targets: Vec<String>,
    /// Scrape interval in milliseconds
    #[serde(default = "default_scrape_interval_ms")]
    pub interval_ms: u64,
    /// Per-target scrape timeout in milliseconds
    #[serde(default = "default_scrape_timeout_ms")]
    pub timeout_ms: u64,
    /// Remote-write components receiving scraped samples
    #[serde(default)]
    pub forward_to: Vec<String>,
}

/// A remote-write component: WAL-backed forwarding to an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteWriteConfig {
    /// Component name, unique among remote-write components
    pub name: String,
    /// `host:port` of the receiving endpoint
    pub endpoint: String,
    /// Connect/send timeout in milliseconds
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

fn default_scrape_interval_ms() -> u64 {
    15_000
}

fn default_scrape_timeout_ms() -> u64 {
    5_000
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
}

fn check_name(name: &str, field: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("'{name}' must be non-empty and use only [a-z0-9_]"),
        ))
    }
}

/// Replace every `${NAME}` with the value of the environment variable `NAME`.
pub fn expand_env(source: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| ConfigError::ParseFailed {
            reason: "unterminated '${' in config".to_owned(),
        })?;
        let name = &after[..end];
        let value = std::env::var(name).map_err(|_| ConfigError::UndefinedVariable {
            name: name.to_owned(),
        })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        if val.is_empty() {
            warn!(env_key, "ignoring empty env override");
        } else {
            *target = val;
        }
    }
}
