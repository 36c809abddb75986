use crate::config::types::{ApiConfig, Config, FetchConfig, InputConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetch_config(&config.fetch)?;
    validate_input_config(&config.input)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the API endpoint template
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if !config.endpoint_template.contains("{id}") {
        return Err(ConfigError::InvalidEndpoint(format!(
            "endpoint-template must contain an {{id}} placeholder, got '{}'",
            config.endpoint_template
        )));
    }

    // The template with the placeholder substituted must be a valid HTTP URL
    let probe = config.endpoint_template.replace("{id}", "0");
    let url = Url::parse(&probe)
        .map_err(|e| ConfigError::InvalidEndpoint(format!("'{}': {}", probe, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEndpoint(format!(
            "endpoint-template must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry and concurrency settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.max_backoff_ms < config.initial_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}) must be >= initial-backoff-ms ({})",
            config.max_backoff_ms, config.initial_backoff_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_in_flight < 1 || config.max_in_flight > 100 {
        return Err(ConfigError::Validation(format!(
            "max-in-flight must be between 1 and 100, got {}",
            config.max_in_flight
        )));
    }

    Ok(())
}

/// Validates the input configuration
fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.identifier_file.is_empty() {
        return Err(ConfigError::Validation(
            "identifier-file cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the output configuration
///
/// The three output targets must be distinct paths: the ledger, the results
/// file and the failure log each have single-writer ownership per run.
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("results-path", &config.results_path),
        ("failure-log-path", &config.failure_log_path),
        ("ledger-path", &config.ledger_path),
    ] {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.results_path == config.failure_log_path
        || config.results_path == config.ledger_path
        || config.failure_log_path == config.ledger_path
    {
        return Err(ConfigError::Validation(
            "results-path, failure-log-path and ledger-path must be distinct".to_string(),
        ));
    }

    Ok(())
}
