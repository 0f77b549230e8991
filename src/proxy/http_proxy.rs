//! HTTP proxy implementation.
//!
//! Forwards one request to the chosen server over HTTP/1.1 and streams the
//! response back, adding the forwarding headers on the way.

use crate::metrics::MetricsCollector;
use crate::util::RequestId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HOST, HeaderMap, HeaderValue};
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Response body handed back to the client.
pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// Per-request forwarding context.
#[derive(Clone)]
pub struct ProxyContext {
    /// Client's address.
    pub client_addr: SocketAddr,
    /// `host:port` of the chosen server.
    pub server_addr: Arc<str>,
    /// Request id, forwarded as `x-request-id`.
    pub request_id: RequestId,
    /// Upper bound on establishing the upstream TCP connection.
    pub connect_timeout: Duration,
    /// Metrics collector.
    pub metrics: MetricsCollector,
}

/// HTTP proxy error.
#[derive(Debug, thiserror::Error)]
pub enum HttpProxyError {
    #[error("failed to connect to server: {0}")]
    Connect(#[from] std::io::Error),

    #[error("connect to server timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),
}

/// Forward a single request to `ctx.server_addr`.
///
/// Never fails towards the caller: forwarding errors become a 502 response.
#[instrument(skip_all, fields(
    method = %req.method(),
    uri = %req.uri(),
    client = %ctx.client_addr,
    server = %ctx.server_addr,
    request_id = %ctx.request_id
))]
pub async fn forward_request(
    req: Request<Incoming>,
    ctx: ProxyContext,
) -> Result<Response<ProxyBody>, Infallible> {
    let start_time = Instant::now();
    let method = req.method().clone();

    match send_upstream(req, &ctx).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            let status = parts.status.as_u16();
            add_response_headers(&mut parts.headers, &ctx);

            let duration = start_time.elapsed();
            ctx.metrics
                .record_request(&ctx.server_addr, method.as_str(), status, duration);

            info!(
                status,
                duration_ms = duration.as_millis(),
                "request forwarded"
            );

            Ok(Response::from_parts(parts, body.boxed()))
        }
        Err(e) => {
            let duration = start_time.elapsed();
            error!(error = %e, duration_ms = duration.as_millis(), "forwarding failed");
            ctx.metrics.record_request(
                &ctx.server_addr,
                method.as_str(),
                StatusCode::BAD_GATEWAY.as_u16(),
                duration,
            );
            Ok(error_response(StatusCode::BAD_GATEWAY, "failed to reach server"))
        }
    }
}

async fn send_upstream(
    mut req: Request<Incoming>,
    ctx: &ProxyContext,
) -> Result<Response<Incoming>, HttpProxyError> {
    let stream = timeout(ctx.connect_timeout, TcpStream::connect(&*ctx.server_addr))
        .await
        .map_err(|_| HttpProxyError::ConnectTimeout(ctx.connect_timeout))??;

    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "failed to set TCP_NODELAY on server connection");
    }

    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            warn!(error = %e, "server connection error");
        }
    });

    // Servers expect origin-form targets
    let origin = req
        .uri()
        .path_and_query()
        .cloned()
        .map(Uri::from)
        .unwrap_or_else(|| Uri::from_static("/"));
    *req.uri_mut() = origin;

    add_request_headers(req.headers_mut(), ctx);

    Ok(sender.send_request(req).await?)
}

/// Add forwarding headers to the request sent to the server.
fn add_request_headers(headers: &mut HeaderMap, ctx: &ProxyContext) {
    let client_ip = ctx.client_addr.ip().to_string();

    if let Ok(value) = HeaderValue::from_str(&client_ip) {
        headers.insert("x-forwarded-for", value.clone());
        headers.insert("x-real-ip", value);
    }

    if let Ok(value) = HeaderValue::from_str(ctx.request_id.as_str()) {
        headers.insert("x-request-id", value);
    }

    // HTTP/1.0 clients may omit Host
    if !headers.contains_key(HOST) {
        if let Ok(value) = HeaderValue::from_str(&ctx.server_addr) {
            headers.insert(HOST, value);
        }
    }
}

/// Add headers to the response sent back to the client.
fn add_response_headers(headers: &mut HeaderMap, ctx: &ProxyContext) {
    if let Ok(value) = HeaderValue::from_str(&ctx.server_addr) {
        headers.insert("x-served-by", value);
    }
}

/// Plain-text response generated by the balancer itself.
pub fn error_response(status: StatusCode, message: &str) -> Response<ProxyBody> {
    let body = Full::new(Bytes::from(format!("{}: {}\n", status, message)))
        .map_err(|never| match never {})
        .boxed();

    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
