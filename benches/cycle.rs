use criterion::{criterion_group, criterion_main, Criterion};
use prometheus_client::registry::Registry;
use windows_service_collector::collector::ServiceCollector;
use windows_service_collector::config::Config;
use windows_service_collector::testing::{MemoryRow, MemorySource};
use windows_service_collector::vocabulary::{START_MODES, STATES, STATUSES};

pub fn cycle(c: &mut Criterion) {
    c.bench_function("cycle with 200 services (prometheus registry)", |b| {
        let mut registry = Registry::default();
        let mut collector = ServiceCollector::new();
        collector
            .init(&mut registry, &Config::default())
            .expect("init to succeed");

        let rows = (0..200u32)
            .map(|i| {
                let i_usize = i as usize;
                MemoryRow::service(
                    &format!("svc{i}"),
                    &format!("Service {i}"),
                    i,
                    "LocalSystem",
                    STATES.entries()[i_usize % STATES.len()],
                    START_MODES.entries()[i_usize % START_MODES.len()],
                    STATUSES.entries()[i_usize % STATUSES.len()],
                )
            })
            .collect();
        let mut source = MemorySource::new(rows);

        b.iter(|| collector.run_cycle(&registry, &mut source).map(|s| s.observations))
    });
}

criterion_group!(benches, cycle);
criterion_main!(benches);
