//! affinity-lb - an HTTP load balancer with sticky sessions
//!
//! This crate provides:
//! - A fixed server pool with per-client session affinity and idle expiry
//! - Round-robin, weighted round-robin, IP-hash, least-sessions and
//!   weighted least-sessions distribution
//! - Active HTTP health checking
//! - An HTTP/1.1 dispatcher that forwards each request to the chosen server
//! - Prometheus metrics

pub mod backend;
pub mod config;
pub mod frontend;
pub mod health;
pub mod metrics;
pub mod proxy;
pub mod util;

pub use config::Config;
