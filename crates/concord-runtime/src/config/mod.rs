//! Configuration module for the Concord runtime.
//!
//! Layered loading through `figment` (defaults, files, `CONCORD_*`
//! environment variables, programmatic overrides), plus validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ClientConfig, ConcordConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
