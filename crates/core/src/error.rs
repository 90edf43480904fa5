//! Error types for the dispatcher and its configuration

use pdf_snapshot_scheduler::PoolError;

/// Errors raised while loading or validating a [`RenderConfig`](crate::RenderConfig)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value could not be parsed
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// A value that must be positive was zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML for this schema
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while constructing a [`RenderDispatcher`](crate::RenderDispatcher)
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}
