//! Configuration validation.

use crate::config::Config;
use hyper::Uri;
use std::collections::HashSet;

/// Validate the configuration.
///
/// Checks for:
/// - A well-formed listen address
/// - At least one server, each with a `host:port` address
/// - No duplicate server addresses
/// - An implemented strategy
/// - Non-zero probe interval, probe timeout and session TTL
///
/// # Returns
///
/// `Ok(())` if valid, or an error message describing every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    if let Err(e) = check_authority(&config.listen) {
        errors.push(format!("invalid listen address '{}': {}", config.listen, e));
    }

    if config.servers.is_empty() {
        errors.push("at least one server must be defined".to_string());
    }

    let mut hosts = HashSet::new();
    for server in &config.servers {
        if let Err(e) = check_authority(&server.host) {
            errors.push(format!("invalid server address '{}': {}", server.host, e));
        }

        if !hosts.insert(server.host.as_str()) {
            errors.push(format!("duplicate server address: {}", server.host));
        }
    }

    if !config.strategy.is_implemented() {
        errors.push(format!(
            "strategy '{}' is not implemented",
            config.strategy
        ));
    }

    if config.health_check.interval.is_zero() {
        errors.push("health check interval must be greater than zero".to_string());
    }

    if config.health_check.timeout.is_zero() {
        errors.push("health check timeout must be greater than zero".to_string());
    }

    if !config.health_check.path.starts_with('/') {
        errors.push(format!(
            "health check path '{}' must start with '/'",
            config.health_check.path
        ));
    }

    if config.sticky_sessions.ttl.is_zero() {
        errors.push("sticky session ttl must be greater than zero".to_string());
    }

    if config.global.metrics.enabled && !config.global.metrics.path.starts_with('/') {
        errors.push(format!(
            "metrics path '{}' must start with '/'",
            config.global.metrics.path
        ));
    }

    // Validate log level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.global.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "invalid log level '{}', must be one of: {}",
            config.global.log_level,
            valid_levels.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// Check that `value` is a bare `host:port` authority.
fn check_authority(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("address cannot be empty".to_string());
    }

    if value.contains('/') {
        return Err("expected host:port without scheme or path".to_string());
    }

    let uri = format!("http://{}", value)
        .parse::<Uri>()
        .map_err(|e| e.to_string())?;

    if uri.host().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }

    if uri.port_u16().is_none() {
        return Err("missing port".to_string());
    }

    Ok(())
}
