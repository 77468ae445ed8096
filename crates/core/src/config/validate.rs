use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Runner concurrency is not 0
/// - Detection edition is a non-empty single path component
/// - Tool timeout is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.runner.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "runner.concurrency cannot be 0".to_string(),
        ));
    }

    let edition = config.detection.edition.trim();
    if edition.is_empty() {
        return Err(ConfigError::ValidationError(
            "detection.edition cannot be empty".to_string(),
        ));
    }
    if edition.contains('/') || edition.contains(char::is_whitespace) {
        return Err(ConfigError::ValidationError(format!(
            "detection.edition must not contain '/' or whitespace: {:?}",
            edition
        )));
    }

    if config.tool.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tool.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
