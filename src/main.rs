//! affinity-lb - an HTTP load balancer with sticky sessions
//!
//! Usage:
//!     affinity-lb --config <path>
//!
//! See --help for more options.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use affinity_lb::backend::BackendRouter;
use affinity_lb::config::{Config, load_config};
use affinity_lb::frontend::{Dispatcher, FrontendListener};
use affinity_lb::health::HealthChecker;
use affinity_lb::metrics::{MetricsCollector, MetricsServer};
use affinity_lb::util::{ShutdownSignal, init_logging};

/// An HTTP load balancer with sticky sessions.
#[derive(Parser, Debug)]
#[command(name = "affinity-lb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from '{}'",
            cli.config.display()
        )
    })?;

    // CLI overrides config
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.global.log_level);

    init_logging(log_level, &config.global.log_format).context("failed to initialize logging")?;

    if cli.validate {
        info!("configuration is valid");
        println!("Configuration is valid.");
        println!("  Listen: {}", config.listen);
        println!("  Strategy: {}", config.strategy);
        println!("  Servers: {}", config.servers.len());
        for server in &config.servers {
            println!("    - {} (weight {})", server.host, server.weight);
        }
        return Ok(());
    }

    info!(
        config_path = %cli.config.display(),
        listen = %config.listen,
        strategy = %config.strategy,
        servers = config.servers.len(),
        "affinity-lb starting"
    );

    for server in &config.servers {
        info!(host = %server.host, weight = server.weight, "configured server");
    }

    run(config)
}

/// Run the load balancer with the given configuration.
fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(run_async(config))
}

/// Async entry point for the load balancer.
async fn run_async(config: Config) -> Result<()> {
    let shutdown = ShutdownSignal::new();
    let metrics = MetricsCollector::new();

    let router = Arc::new(
        BackendRouter::from_config(&config).context("failed to build server pool")?,
    );

    let mut handles = Vec::new();

    let checker = HealthChecker::new(
        Arc::clone(router.pool()),
        &config.health_check,
        metrics.clone(),
    );
    handles.push(tokio::spawn(checker.run(shutdown.subscribe())));

    if config.global.metrics.enabled {
        let metrics_config = &config.global.metrics;
        let server = MetricsServer::new(
            metrics_config.address,
            metrics_config.path.clone(),
            metrics.clone(),
        );
        handles.push(tokio::spawn(server.run(shutdown.subscribe())));
    }

    let dispatcher = Dispatcher::new(Arc::clone(&router), metrics, config.proxy.connect_timeout);
    let listener = FrontendListener::bind(&config.listen, dispatcher)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.listen))?;
    handles.push(tokio::spawn(listener.run(shutdown.subscribe())));

    info!("affinity-lb is running");
    info!("press Ctrl+C to stop");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("received shutdown signal");
        }
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
        }
    }

    shutdown.shutdown();

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "task failed during shutdown");
        }
    }

    info!("affinity-lb shut down complete");
    Ok(())
}
