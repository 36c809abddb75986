use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is used to detect if the configuration has changed between runs.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[api]
endpoint-template = "https://api.example.com/v1/products/{id}"

[fetch]
max-attempts = 3
initial-backoff-ms = 100
max-backoff-ms = 5000
backoff-jitter-ms = 50
request-timeout-secs = 10
max-in-flight = 4

[input]
identifier-file = "./product_ids.tsv"
has-header = true

[output]
results-path = "./products.tsv"
failure-log-path = "./failures.log"
ledger-path = "./ledger.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(
            config.api.endpoint_template,
            "https://api.example.com/v1/products/{id}"
        );
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.fetch.max_in_flight, 4);
        assert!(config.input.has_header);
        assert_eq!(config.output.results_path, "./products.tsv");
    }

    #[test]
    fn test_fetch_section_is_optional() {
        let config_content = r#"
[api]
endpoint-template = "https://api.example.com/v1/products/{id}"

[input]
identifier-file = "./product_ids.tsv"

[output]
results-path = "./products.tsv"
failure-log-path = "./failures.log"
ledger-path = "./ledger.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.fetch.initial_backoff_ms, 500);
        assert_eq!(config.fetch.max_backoff_ms, 30_000);
        assert!(!config.input.has_header);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is not toml [");
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_config_hash_is_stable() {
        let file = create_temp_config("same content");
        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_config_hash_changes_with_content() {
        let file1 = create_temp_config("content a");
        let file2 = create_temp_config("content b");
        assert_ne!(
            compute_config_hash(file1.path()).unwrap(),
            compute_config_hash(file2.path()).unwrap()
        );
    }
}
