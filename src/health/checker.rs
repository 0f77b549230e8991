//! Active health checker.
//!
//! Periodically probes every server in the pool and sets its liveness flag from
//! the outcome. Runs on its own task; routing never waits on it.

use crate::backend::ServerPool;
use crate::config::HealthCheckConfig;
use crate::metrics::MetricsCollector;
use bytes::Bytes;
use futures::future::join_all;
use http_body_util::Empty;
use hyper::header::{HOST, HeaderValue};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};

/// Why a probe marked a server dead.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid probe path: {0}")]
    InvalidPath(String),

    #[error("unexpected status: {0}")]
    Status(StatusCode),

    #[error("probe timed out")]
    Timeout,
}

/// Outcome counts of one probe round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub alive: usize,
    pub dead: usize,
}

/// Active health checker that probes every server in a pool.
pub struct HealthChecker {
    /// Pool whose liveness flags are updated.
    pool: Arc<ServerPool>,
    /// Time between probe rounds.
    interval: Duration,
    /// Per-probe timeout.
    timeout: Duration,
    /// HTTP path requested by each probe.
    path: Arc<str>,
    /// Metrics collector.
    metrics: MetricsCollector,
}

impl HealthChecker {
    /// Create a new health checker.
    pub fn new(pool: Arc<ServerPool>, config: &HealthCheckConfig, metrics: MetricsCollector) -> Self {
        Self {
            pool,
            interval: config.interval,
            timeout: config.timeout,
            path: Arc::from(config.path.as_str()),
            metrics,
        }
    }

    /// Probe every server in parallel and wait for all of them.
    ///
    /// Each server's flag is set from its own probe only.
    pub async fn probe_all(&self) -> ProbeSummary {
        let tasks = self.pool.servers().iter().map(|server| {
            let server = Arc::clone(server);
            let path = Arc::clone(&self.path);
            let probe_timeout = self.timeout;
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                let result = probe(server.address(), &path, probe_timeout).await;
                let alive = result.is_ok();
                let was_alive = server.set_alive(alive);

                match result {
                    Ok(()) if !was_alive => {
                        info!(server = %server.address(), "server is alive again");
                    }
                    Ok(()) => {
                        debug!(server = %server.address(), "health check passed");
                    }
                    Err(e) if was_alive => {
                        warn!(server = %server.address(), error = %e, "server marked dead");
                    }
                    Err(e) => {
                        debug!(server = %server.address(), error = %e, "server still dead");
                    }
                }

                metrics.record_health_check(server.address(), alive);
                metrics.set_server_alive(server.address(), alive);
                metrics.set_sticky_sessions(server.address(), server.session_count());

                alive
            })
        });

        let mut summary = ProbeSummary::default();
        for result in join_all(tasks).await {
            match result {
                Ok(true) => summary.alive += 1,
                Ok(false) => summary.dead += 1,
                Err(e) => error!(error = %e, "health probe task failed"),
            }
        }

        debug!(alive = summary.alive, dead = summary.dead, "health check round complete");
        summary
    }

    /// Run probe rounds on a fixed interval until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            servers = self.pool.len(),
            interval_ms = self.interval.as_millis(),
            timeout_ms = self.timeout.as_millis(),
            "health checker starting"
        );

        let mut check_interval = interval(self.interval);
        check_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = check_interval.tick() => {
                    self.probe_all().await;
                }

                _ = shutdown.recv() => {
                    info!("health checker shutting down");
                    break;
                }
            }
        }
    }
}

/// Probe one server: `GET path` must answer 2xx within `probe_timeout`.
pub async fn probe(address: &str, path: &str, probe_timeout: Duration) -> Result<(), ProbeError> {
    timeout(probe_timeout, send_probe(address, path))
        .await
        .map_err(|_| ProbeError::Timeout)?
}

async fn send_probe(address: &str, path: &str) -> Result<(), ProbeError> {
    let uri = path
        .parse::<Uri>()
        .map_err(|e| ProbeError::InvalidPath(e.to_string()))?;

    let stream = TcpStream::connect(address).await?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "probe connection error");
        }
    });

    let mut req = Request::new(Empty::<Bytes>::new());
    *req.method_mut() = Method::GET;
    *req.uri_mut() = uri;
    if let Ok(host) = HeaderValue::from_str(address) {
        req.headers_mut().insert(HOST, host);
    }

    let response = sender.send_request(req).await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ProbeError::Status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DEFAULT_SESSION_TTL, Server};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve every connection with a fixed status line.
    async fn start_backend(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        status_line
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                });
            }
        });

        addr.to_string()
    }

    /// Address with nothing listening on it.
    async fn closed_address() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    fn checker(addresses: &[String]) -> HealthChecker {
        let servers = addresses.iter().map(|a| Server::new(a.clone(), 1)).collect();
        let pool = Arc::new(ServerPool::new(servers, DEFAULT_SESSION_TTL).unwrap());
        let config = HealthCheckConfig {
            interval: Duration::from_millis(50),
            timeout: Duration::from_secs(2),
            path: "/".to_string(),
        };
        HealthChecker::new(pool, &config, MetricsCollector::new())
    }

    #[tokio::test]
    async fn test_probe_success() {
        let addr = start_backend("200 OK").await;
        assert!(probe(&addr, "/", Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_error_status() {
        let addr = start_backend("503 Service Unavailable").await;
        let result = probe(&addr, "/", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Status(StatusCode::SERVICE_UNAVAILABLE))));
    }

    #[tokio::test]
    async fn test_probe_refused() {
        let addr = closed_address().await;
        let result = probe(&addr, "/", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Connect(_))));
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        // Accepts but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let result = probe(&addr, "/", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(ProbeError::Timeout)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_probe_all_sets_each_flag_independently() {
        let up = start_backend("200 OK").await;
        let failing = start_backend("500 Internal Server Error").await;
        let down = closed_address().await;

        let checker = checker(&[up, failing, down]);
        let summary = checker.probe_all().await;

        assert_eq!(summary, ProbeSummary { alive: 1, dead: 2 });
        let pool = &checker.pool;
        assert!(pool.server(0).is_alive());
        assert!(!pool.server(1).is_alive());
        assert!(!pool.server(2).is_alive());
    }

    #[tokio::test]
    async fn test_probe_all_revives_server() {
        let up = start_backend("200 OK").await;
        let checker = checker(&[up]);
        checker.pool.server(0).set_alive(false);

        checker.probe_all().await;
        assert!(checker.pool.server(0).is_alive());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let down = closed_address().await;
        let checker = checker(&[down]);
        let pool = Arc::clone(&checker.pool);
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(checker.run(rx));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!pool.server(0).is_alive());

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
