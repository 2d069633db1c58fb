use super::{types::Config, ConfigError};
use crate::concat::MANIFEST_FILE_NAME;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Merge timeout and concurrency are positive
/// - Output file name is a bare, non-hidden file name that does not
///   collide with the concat manifest
/// - At least one fetch scheme is allowed
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.merge.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "merge.timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.merge.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "merge.max_concurrent must be greater than 0".to_string(),
        ));
    }

    let name = &config.merge.output_file_name;
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.starts_with('.')
        || name == MANIFEST_FILE_NAME
    {
        return Err(ConfigError::ValidationError(format!(
            "merge.output_file_name must be a plain file name, got {:?}",
            name
        )));
    }

    if config.fetch.allowed_schemes.is_empty() {
        return Err(ConfigError::ValidationError(
            "fetch.allowed_schemes cannot be empty".to_string(),
        ));
    }

    if config.fetch.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "fetch.timeout_secs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
