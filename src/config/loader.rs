//! Configuration file loading.

use crate::config::{Config, validate_config};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a YAML file.
///
/// Reads the file, parses the YAML, and validates the result. Any error here is
/// fatal: the balancer must not start serving with a configuration that failed
/// to load.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    validate_config(&config).map_err(ConfigError::ValidationError)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config() {
        let file = write_config(
            r#"
listen: "127.0.0.1:8080"
strategy: weighted-round-robin
servers:
  - host: "localhost:1111"
    weight: 2
  - host: "localhost:1112"
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.strategy, Strategy::WeightedRoundRobin);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[1].weight, 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.yaml");
        assert!(matches!(result.unwrap_err(), ConfigError::ReadError(_)));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let file = write_config("not: valid: yaml: {{{}}}");
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ParseError(_)
        ));
    }

    #[test]
    fn test_load_unknown_strategy() {
        let file = write_config(
            r#"
listen: "127.0.0.1:8080"
strategy: fastest
servers:
  - host: "localhost:1111"
"#,
        );
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ParseError(_)
        ));
    }

    #[test]
    fn test_load_empty_server_list() {
        let file = write_config(
            r#"
listen: "127.0.0.1:8080"
strategy: round-robin
servers: []
"#,
        );
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_load_zero_weight_and_route() {
        use crate::backend::BackendRouter;

        let file = write_config(
            r#"
listen: "127.0.0.1:8080"
strategy: weighted-round-robin
servers:
  - host: "localhost:1111"
    weight: 0
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.servers[0].weight, 0);

        let router = BackendRouter::from_config(&config).unwrap();
        for i in 0..3 {
            let server = router.select_client(&format!("10.0.0.{}:4000", i)).unwrap();
            assert_eq!(server.address(), "localhost:1111");
        }
    }
}
