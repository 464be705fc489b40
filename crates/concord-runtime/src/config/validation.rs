//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ClientConfig, ConcordConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ConcordConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_client_config(&config.client)?;
    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(['=', ',', ' ']) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: '{target}'"
            )));
        }
    }

    Ok(())
}

/// Validates event engine configuration.
fn validate_client_config(client: &ClientConfig) -> ConfigResult<()> {
    if client.interceptor_buffer == 0 {
        return Err(ConfigError::validation(
            "Interceptor buffer must be greater than 0",
        ));
    }

    if client.default_wait_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Default wait timeout must be greater than 0",
        ));
    }

    Ok(())
}
