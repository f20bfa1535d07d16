use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use termrd::handlers::{builtin, Registry};
use termrd::license::{License, LicenseGate, StaticLicenseExtractor};
use termrd::parser::{CommandParser, Parse, ParserOptions};
use termrd::router::{NoopEvents, Router};
use termrd_proto::{TerminalRequest, DEMO_APPLICATION_ID};
use tokio_util::sync::CancellationToken;

// Parser in isolation, then the full route (license, parse, check, run)
// with no-op events so logging stays out of the measurement.

fn registry() -> Arc<Registry> {
    Arc::new(
        builtin::register(Registry::builder(), "bench")
            .build()
            .unwrap(),
    )
}

fn parsing_benchmark(c: &mut Criterion) {
    let registry = registry();
    let parser = CommandParser::new(Arc::clone(registry.store()), ParserOptions::default()).unwrap();
    let request = TerminalRequest::new("1", "test --opt1 \"some value\" -c 42 -v");

    let mut group = c.benchmark_group("parsing");
    group.throughput(Throughput::Bytes(request.raw.len() as u64));
    group.bench_function("parse_test_command", |b| b.iter(|| parser.parse(&request).unwrap()));
    group.bench_function("parse_subcommand", |b| {
        let request = TerminalRequest::new("1", "server license info");
        b.iter(|| parser.parse(&request).unwrap())
    });
    group.finish();
}

fn routing_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let registry = registry();
    let parser = CommandParser::new(Arc::clone(registry.store()), ParserOptions::default()).unwrap();
    let license = License::new(DEMO_APPLICATION_ID, "bench");
    let extractor = StaticLicenseExtractor::from_license(&license).unwrap();
    let gate = Arc::new(LicenseGate::new(Arc::new(extractor), DEMO_APPLICATION_ID));
    let router = Router::new(gate, Arc::new(parser), registry).with_events(Arc::new(NoopEvents));
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("routing");
    group.throughput(Throughput::Elements(1));
    group.bench_function("route_ping", |b| {
        b.to_async(&runtime).iter_batched(
            || TerminalRequest::new("1", "ping"),
            |request| {
                let router = &router;
                let cancel = &cancel;
                async move { router.route(&request, cancel).await }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, parsing_benchmark, routing_benchmark);
criterion_main!(benches);
