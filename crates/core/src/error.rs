//! Error types shared by every flowline crate.

/// Top-level flowline error.
#[derive(Debug, thiserror::Error)]
pub enum FlowlineError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Telemetry registry errors.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("{path}: no such file or directory")]
    FileNotFound { path: String },

    /// The file is not valid TOML or has unknown fields.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A `${VAR}` reference names a variable that is not set.
    #[error("undefined variable '{name}' referenced in config")]
    UndefinedVariable { name: String },

    /// A field holds a value the engine cannot run with.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Telemetry registry errors.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Another recorder owns the `metrics` global slot.
    #[error("a foreign global metrics recorder is already installed")]
    ForeignRecorder,
}
