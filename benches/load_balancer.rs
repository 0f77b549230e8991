//! Benchmarks for the selection hot path.

use affinity_lb::backend::{BackendRouter, DEFAULT_SESSION_TTL};
use affinity_lb::backend::algorithms::hash_client;
use affinity_lb::config::{ServerConfig, Strategy};
use affinity_lb::metrics::MetricsCollector;
use affinity_lb::util::RequestId;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::net::SocketAddr;
use std::time::Duration;

fn create_router(strategy: Strategy, num_servers: usize) -> BackendRouter {
    let servers: Vec<ServerConfig> = (0..num_servers)
        .map(|i| ServerConfig {
            host: format!("127.0.0.1:{}", 9000 + i),
            weight: (i % 4 + 1) as u32,
        })
        .collect();

    BackendRouter::build(&servers, strategy, DEFAULT_SESSION_TTL).unwrap()
}

/// Distinct client addresses so every call takes the non-sticky path.
fn clients(n: usize) -> Vec<SocketAddr> {
    (0..n)
        .map(|i| SocketAddr::from(([10, (i >> 16) as u8, (i >> 8) as u8, i as u8], 40000)))
        .collect()
}

fn benchmark_new_clients(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_new_client");
    group.throughput(Throughput::Elements(1));

    for strategy in [
        Strategy::RoundRobin,
        Strategy::WeightedRoundRobin,
        Strategy::IpHash,
        Strategy::LeastConnection,
        Strategy::WeightedLeastConnection,
    ] {
        group.bench_function(BenchmarkId::from_parameter(strategy), |b| {
            let router = create_router(strategy, 10);
            let clients = clients(4096);
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % clients.len();
                // Clear the binding so the next pass is a fresh decision again
                if let Ok(server) = router.select(black_box(clients[i])) {
                    server.sessions().clear();
                }
            })
        });
    }

    group.finish();
}

fn benchmark_sticky_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_sticky");

    for sessions in [10usize, 1000] {
        let router = create_router(Strategy::RoundRobin, 10);
        let clients = clients(sessions);
        for client in &clients {
            router.select(*client).unwrap();
        }
        let client = clients[sessions / 2];

        group.bench_with_input(BenchmarkId::from_parameter(sessions), &client, |b, client| {
            b.iter(|| {
                black_box(router.select(*client).ok());
            })
        });
    }

    group.finish();
}

fn benchmark_hash(c: &mut Criterion) {
    c.bench_function("hash_client", |b| {
        b.iter(|| black_box(hash_client(black_box("192.168.1.100:12345"))))
    });
}

fn benchmark_metrics(c: &mut Criterion) {
    let collector = MetricsCollector::new();

    let mut group = c.benchmark_group("metrics");
    group.throughput(Throughput::Elements(1));

    group.bench_function("record_request", |b| {
        b.iter(|| {
            collector.record_request(
                black_box("127.0.0.1:9000"),
                black_box("GET"),
                black_box(200),
                black_box(Duration::from_millis(10)),
            );
        })
    });

    group.bench_function("connection_opened", |b| {
        b.iter(|| {
            collector.connection_opened();
        })
    });

    group.finish();
}

fn benchmark_request_id(c: &mut Criterion) {
    c.bench_function("request_id", |b| {
        b.iter(|| {
            black_box(RequestId::new());
        })
    });
}

criterion_group!(
    benches,
    benchmark_new_clients,
    benchmark_sticky_hit,
    benchmark_hash,
    benchmark_metrics,
    benchmark_request_id,
);

criterion_main!(benches);
