//! Frontend listener implementation.
//!
//! Accepts client connections and serves HTTP/1.1 on each of them, handing
//! every request to the [`Dispatcher`].

use crate::frontend::Dispatcher;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

/// Frontend listener that accepts and handles connections.
pub struct FrontendListener {
    /// TCP listener.
    listener: TcpListener,
    /// Request handler shared by every connection.
    dispatcher: Dispatcher,
}

impl FrontendListener {
    /// Bind the listener to `listen` (`host:port`).
    pub async fn bind(listen: &str, dispatcher: Dispatcher) -> std::io::Result<Self> {
        let listener = TcpListener::bind(listen).await?;

        info!(
            listen = %listener.local_addr()?,
            algorithm = dispatcher.router().algorithm(),
            servers = dispatcher.router().pool().len(),
            session_ttl = ?dispatcher.router().pool().session_ttl(),
            "frontend listener bound"
        );

        Ok(Self {
            listener,
            dispatcher,
        })
    }

    /// The address actually bound, useful when listening on port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the listener, accepting connections until shutdown.
    #[instrument(skip_all, fields(listen = ?self.listener.local_addr().ok()))]
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!("frontend listener starting");

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                _ = shutdown.recv() => {
                    info!("frontend listener shutting down");
                    break;
                }
            }
        }
    }

    /// Serve one client connection on its own task.
    fn handle_connection(&self, stream: TcpStream, client_addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY on client connection");
        }

        let dispatcher = self.dispatcher.clone();
        dispatcher.metrics().connection_opened();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let metrics = dispatcher.metrics().clone();

            // Keep-alive connections route every request independently
            let service = service_fn(move |req| {
                let dispatcher = dispatcher.clone();
                async move { dispatcher.dispatch(req, client_addr).await }
            });

            let result = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(TokioIo::new(stream), service)
                .await;

            metrics.connection_closed();
            let duration = start_time.elapsed();

            match result {
                Ok(()) => debug!(
                    client = %client_addr,
                    duration_ms = duration.as_millis(),
                    "connection completed"
                ),
                Err(e) => warn!(
                    client = %client_addr,
                    duration_ms = duration.as_millis(),
                    error = %e,
                    "connection handling failed"
                ),
            }
        });
    }
}
