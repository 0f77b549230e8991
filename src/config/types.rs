//! Configuration data types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// Address the dispatcher listens on (`host:port`)
    #[serde(alias = "address")]
    pub listen: String,

    /// Distribution strategy used to pick a server per request
    pub strategy: Strategy,

    /// Upstream servers, in configuration order
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Active health probing
    #[serde(default)]
    pub health_check: HealthCheckConfig,

    /// Sticky-session settings
    #[serde(default)]
    pub sticky_sessions: StickySessionConfig,

    /// Forwarding settings
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Global configuration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Json,
            metrics: MetricsConfig::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Whether metrics endpoint is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Address to bind metrics server
    #[serde(default = "default_metrics_address")]
    pub address: SocketAddr,

    /// Path for metrics endpoint
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
            path: default_metrics_path(),
        }
    }
}

/// Distribution strategy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    IpHash,
    LeastConnection,
    WeightedLeastConnection,
    /// Declared but not implemented; rejected by validation.
    WeightedResponseTime,
}

impl Strategy {
    /// The configuration name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::WeightedRoundRobin => "weighted-round-robin",
            Strategy::IpHash => "ip-hash",
            Strategy::LeastConnection => "least-connection",
            Strategy::WeightedLeastConnection => "weighted-least-connection",
            Strategy::WeightedResponseTime => "weighted-response-time",
        }
    }

    /// Whether a balancer can be built for this strategy.
    pub fn is_implemented(&self) -> bool {
        !matches!(self, Strategy::WeightedResponseTime)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server address as `host:port`
    pub host: String,

    /// Weight for weight-aware strategies (default: 1)
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckConfig {
    /// How often every server is probed
    #[serde(default = "default_health_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Per-probe timeout
    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// HTTP path requested by the probe
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: default_health_interval(),
            timeout: default_health_timeout(),
            path: default_health_path(),
        }
    }
}

/// Sticky-session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StickySessionConfig {
    /// Inactivity period after which a client binding expires
    #[serde(default = "default_session_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for StickySessionConfig {
    fn default() -> Self {
        Self {
            ttl: default_session_ttl(),
        }
    }
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Timeout for connecting to the chosen server
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_metrics_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9090))
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_health_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_health_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_weight() -> u32 {
    1
}

/// Custom serde module for humantime durations.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
