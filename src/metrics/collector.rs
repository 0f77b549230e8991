//! Metrics collector using prometheus-client.
//!
//! Provides metrics for request counts, latency, connections, and backend liveness.

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Labels for request metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub server: String,
    pub method: String,
    pub status: String,
}

/// Labels for per-server metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ServerLabels {
    pub server: String,
}

/// Labels for health check metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HealthCheckLabels {
    pub server: String,
    pub result: HealthCheckResult,
}

/// Result of a health check.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum HealthCheckResult {
    Success,
    Failure,
}

/// Collects and stores all metrics.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsCollectorInner>,
}

struct MetricsCollectorInner {
    /// Forwarded requests by server, method and status.
    requests_total: Family<RequestLabels, Counter>,
    /// Forwarding latency per server (in seconds).
    request_duration_seconds: Family<ServerLabels, Histogram>,
    /// Requests rejected because no server was alive.
    unavailable_total: Counter,
    /// Open client connections.
    active_connections: Gauge,
    /// Liveness per server (1 = alive, 0 = dead).
    server_alive: Family<ServerLabels, Gauge>,
    /// Sticky sessions per server.
    sticky_sessions: Family<ServerLabels, Gauge>,
    /// Health probe outcomes.
    health_checks_total: Family<HealthCheckLabels, Counter>,
    /// The prometheus registry.
    registry: Registry,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<RequestLabels, Counter>::default();
        let request_duration_seconds =
            Family::<ServerLabels, Histogram>::new_with_constructor(|| {
                // Buckets: 1ms, 2.5ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
                Histogram::new(exponential_buckets(0.001, 2.5, 13))
            });
        let unavailable_total = Counter::default();
        let active_connections = Gauge::default();
        let server_alive = Family::<ServerLabels, Gauge>::default();
        let sticky_sessions = Family::<ServerLabels, Gauge>::default();
        let health_checks_total = Family::<HealthCheckLabels, Counter>::default();

        registry.register(
            "affinity_lb_requests",
            "Total number of requests forwarded",
            requests_total.clone(),
        );
        registry.register(
            "affinity_lb_request_duration_seconds",
            "Forwarding duration in seconds",
            request_duration_seconds.clone(),
        );
        registry.register(
            "affinity_lb_unavailable",
            "Requests rejected because no server was available",
            unavailable_total.clone(),
        );
        registry.register(
            "affinity_lb_active_connections",
            "Number of open client connections",
            active_connections.clone(),
        );
        registry.register(
            "affinity_lb_server_alive",
            "Server liveness (1=alive, 0=dead)",
            server_alive.clone(),
        );
        registry.register(
            "affinity_lb_sticky_sessions",
            "Number of clients bound to each server",
            sticky_sessions.clone(),
        );
        registry.register(
            "affinity_lb_health_checks",
            "Total number of health probes performed",
            health_checks_total.clone(),
        );

        Self {
            inner: Arc::new(MetricsCollectorInner {
                requests_total,
                request_duration_seconds,
                unavailable_total,
                active_connections,
                server_alive,
                sticky_sessions,
                health_checks_total,
                registry,
            }),
        }
    }

    /// Get the prometheus registry for encoding.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Record a forwarded request.
    pub fn record_request(&self, server: &str, method: &str, status: u16, duration: Duration) {
        let labels = RequestLabels {
            server: server.to_string(),
            method: method.to_string(),
            status: status.to_string(),
        };
        self.inner.requests_total.get_or_create(&labels).inc();

        let server_labels = ServerLabels {
            server: server.to_string(),
        };
        self.inner
            .request_duration_seconds
            .get_or_create(&server_labels)
            .observe(duration.as_secs_f64());
    }

    /// Record a request that found no live server.
    pub fn record_unavailable(&self) {
        self.inner.unavailable_total.inc();
    }

    /// Increment active connections.
    pub fn connection_opened(&self) {
        self.inner.active_connections.inc();
    }

    /// Decrement active connections.
    pub fn connection_closed(&self) {
        self.inner.active_connections.dec();
    }

    /// Update server liveness.
    pub fn set_server_alive(&self, server: &str, alive: bool) {
        let labels = ServerLabels {
            server: server.to_string(),
        };
        self.inner
            .server_alive
            .get_or_create(&labels)
            .set(i64::from(alive));
    }

    /// Update the sticky-session count of a server.
    pub fn set_sticky_sessions(&self, server: &str, count: usize) {
        let labels = ServerLabels {
            server: server.to_string(),
        };
        self.inner
            .sticky_sessions
            .get_or_create(&labels)
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record a health check result.
    pub fn record_health_check(&self, server: &str, success: bool) {
        let labels = HealthCheckLabels {
            server: server.to_string(),
            result: if success {
                HealthCheckResult::Success
            } else {
                HealthCheckResult::Failure
            },
        };
        self.inner.health_checks_total.get_or_create(&labels).inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    fn encoded(collector: &MetricsCollector) -> String {
        let mut buffer = String::new();
        encode(&mut buffer, collector.registry()).unwrap();
        buffer
    }

    #[test]
    fn test_record_request() {
        let collector = MetricsCollector::new();
        collector.record_request("localhost:1111", "GET", 200, Duration::from_millis(50));

        let output = encoded(&collector);
        assert!(output.contains("affinity_lb_requests_total"));
        assert!(output.contains("server=\"localhost:1111\""));
        assert!(output.contains("status=\"200\""));
    }

    #[test]
    fn test_connection_tracking() {
        let collector = MetricsCollector::new();
        collector.connection_opened();
        collector.connection_opened();
        collector.connection_closed();

        assert!(encoded(&collector).contains("affinity_lb_active_connections 1"));
    }

    #[test]
    fn test_liveness_and_sessions() {
        let collector = MetricsCollector::new();
        collector.set_server_alive("localhost:1111", true);
        collector.set_server_alive("localhost:1112", false);
        collector.set_sticky_sessions("localhost:1111", 4);
        collector.record_health_check("localhost:1112", false);
        collector.record_unavailable();

        let output = encoded(&collector);
        assert!(output.contains("affinity_lb_server_alive{server=\"localhost:1112\"} 0"));
        assert!(output.contains("affinity_lb_sticky_sessions{server=\"localhost:1111\"} 4"));
        assert!(output.contains("result=\"Failure\""));
        assert!(output.contains("affinity_lb_unavailable_total 1"));
    }
}
