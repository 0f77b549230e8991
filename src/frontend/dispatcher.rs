//! Per-request dispatch: route, then forward or reject.

use crate::backend::BackendRouter;
use crate::metrics::MetricsCollector;
use crate::proxy::{ProxyBody, ProxyContext, error_response, forward_request};
use crate::util::RequestId;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Turns each client request into one routing decision and one upstream call.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<BackendRouter>,
    metrics: MetricsCollector,
    connect_timeout: Duration,
}

impl Dispatcher {
    pub fn new(router: Arc<BackendRouter>, metrics: MetricsCollector, connect_timeout: Duration) -> Self {
        Self {
            router,
            metrics,
            connect_timeout,
        }
    }

    pub fn router(&self) -> &Arc<BackendRouter> {
        &self.router
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Handle one request from `client_addr`.
    ///
    /// Answers 503 without contacting any server when no server is available.
    pub async fn dispatch(
        &self,
        req: Request<Incoming>,
        client_addr: SocketAddr,
    ) -> Result<Response<ProxyBody>, Infallible> {
        let request_id = RequestId::from_headers(req.headers());

        let server = match self.router.select(client_addr) {
            Ok(server) => server,
            Err(e) => {
                self.metrics.record_unavailable();
                warn!(
                    client = %client_addr,
                    request_id = %request_id,
                    method = %req.method(),
                    uri = %req.uri(),
                    "{}", e
                );
                return Ok(error_response(StatusCode::SERVICE_UNAVAILABLE, "no server available"));
            }
        };

        let ctx = ProxyContext {
            client_addr,
            server_addr: Arc::from(server.address()),
            request_id,
            connect_timeout: self.connect_timeout,
            metrics: self.metrics.clone(),
        };

        forward_request(req, ctx).await
    }
}
