use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use windows_service_collector::collector::ServiceCollector;
use windows_service_collector::config::Config;
use windows_service_collector::source::SourceError;
use windows_service_collector::testing::{MemoryRow, MemorySource, RecordingRegistry};
use windows_service_collector::vocabulary::{START_MODES, STATES, STATUSES};
use windows_service_collector::Error;

fn my_service() -> MemoryRow {
    MemoryRow::service(
        "MyService",
        "My Service",
        4242,
        "LocalService",
        "Running",
        "Auto",
        "OK",
    )
}

fn hot_entries(registry: &RecordingRegistry, family: &str) -> Vec<Vec<String>> {
    registry
        .observations_of(family)
        .into_iter()
        .filter(|o| o.value == 1.0)
        .map(|o| o.label_values)
        .collect()
}

#[test]
fn basic_flow() {
    let mut registry = RecordingRegistry::default();
    let mut collector = ServiceCollector::new();
    collector.init(&mut registry, &Config::default()).unwrap();

    let mut source = MemorySource::new(vec![my_service()]);
    let summary = collector.run_cycle(&registry, &mut source).unwrap();

    assert_eq!(1, summary.rows);
    assert_eq!(
        1 + STATES.len() + START_MODES.len() + STATUSES.len(),
        summary.observations
    );

    let info = registry.observations_of("windows_service_info");
    assert_eq!(1, info.len());
    assert_eq!(1.0, info[0].value);
    assert_eq!(
        vec!["MyService", "My Service", "4242", "LocalService"],
        info[0].label_values
    );

    let states = registry.observations_of("windows_service_state");
    assert_eq!(8, states.len());
    assert_eq!(
        vec![vec!["MyService".to_string(), "running".to_string()]],
        hot_entries(&registry, "windows_service_state")
    );

    let start_modes = registry.observations_of("windows_service_start_mode");
    assert_eq!(5, start_modes.len());
    assert_eq!(
        vec![vec!["MyService".to_string(), "auto".to_string()]],
        hot_entries(&registry, "windows_service_start_mode")
    );

    let statuses = registry.observations_of("windows_service_status");
    assert_eq!(12, statuses.len());
    assert_eq!(
        vec![vec!["MyService".to_string(), "ok".to_string()]],
        hot_entries(&registry, "windows_service_status")
    );

    // Vocabulary order is preserved.
    let state_labels: Vec<_> = states.iter().map(|o| o.label_values[1].as_str()).collect();
    assert_eq!(STATES.entries(), state_labels.as_slice());

    collector.exit();
}

#[test]
fn state_transition_overwrites_previous_cycle() {
    let mut registry = RecordingRegistry::default();
    let mut collector = ServiceCollector::new();
    collector.init(&mut registry, &Config::default()).unwrap();

    let mut source = MemorySource::new(vec![my_service()]);
    let first = collector.run_cycle(&registry, &mut source).unwrap();

    source.set_rows(vec![MemoryRow::service(
        "MyService",
        "My Service",
        0,
        "LocalService",
        "Stopped",
        "Auto",
        "OK",
    )]);
    let second = collector.run_cycle(&registry, &mut source).unwrap();
    assert_eq!(first.rows, second.rows);

    assert_eq!(
        Some(0.0),
        registry.value("windows_service_state", &["MyService", "running"])
    );
    assert_eq!(
        Some(1.0),
        registry.value("windows_service_state", &["MyService", "stopped"])
    );
}

#[test]
fn many_services_one_timestamp() {
    let mut registry = RecordingRegistry::default();
    let mut collector = ServiceCollector::new();
    collector.init(&mut registry, &Config::default()).unwrap();

    let rows = (0..50)
        .map(|i| {
            MemoryRow::service(
                &format!("svc{i}"),
                &format!("Service {i}"),
                i,
                "LocalSystem",
                STATES.entries()[i as usize % STATES.len()],
                START_MODES.entries()[i as usize % START_MODES.len()],
                STATUSES.entries()[i as usize % STATUSES.len()],
            )
        })
        .collect();
    let mut source = MemorySource::new(rows);

    let summary = collector.run_cycle(&registry, &mut source).unwrap();
    assert_eq!(50, summary.rows);

    let observations = registry.observations();
    assert_eq!(50 * 26, observations.len());
    assert!(observations.iter().all(|o| o.timestamp == summary.timestamp));
    // Every service has exactly one hot state, start mode and status.
    assert_eq!(50 * 4, observations.iter().filter(|o| o.value == 1.0).count());
}

#[test]
fn transport_failures_leave_registry_untouched() {
    let mut registry = RecordingRegistry::default();
    let mut collector = ServiceCollector::new();
    collector.init(&mut registry, &Config::default()).unwrap();

    let mut source =
        MemorySource::new(vec![my_service()]).fail_query(SourceError::with_code("denied", 5));
    let err = collector.run_cycle(&registry, &mut source).unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, Error::Query { .. }));
    assert!(registry.observations().is_empty());
    assert_eq!(source.sessions_opened(), source.sessions_released());

    // The collector stays operational; the next cycle may succeed.
    assert!(collector.is_operational());
    let mut source = MemorySource::new(vec![my_service()]);
    assert!(collector.run_cycle(&registry, &mut source).is_ok());
}

mod prometheus {
    use super::*;

    #[test]
    fn exposition() {
        let mut registry = Registry::default();
        let mut collector = ServiceCollector::new();
        collector.init(&mut registry, &Config::default()).unwrap();

        let mut source = MemorySource::new(vec![my_service()]);
        collector.run_cycle(&registry, &mut source).unwrap();

        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();

        assert!(buffer.contains(
            "# HELP windows_service_info A metric for Windows Service information.\n"
        ));
        assert!(buffer.contains("# TYPE windows_service_info gauge\n"));
        assert!(buffer.contains(
            "windows_service_info{name=\"MyService\",display_name=\"My Service\",process_id=\"4242\",run_as=\"LocalService\"} 1.0\n"
        ));
        assert!(buffer.contains("# TYPE windows_service_state gauge\n"));
        assert!(buffer.contains("windows_service_state{name=\"MyService\",state=\"running\"} 1.0\n"));
        assert!(buffer.contains("windows_service_state{name=\"MyService\",state=\"paused\"} 0.0\n"));
        assert!(buffer
            .contains("windows_service_start_mode{name=\"MyService\",start_mode=\"auto\"} 1.0\n"));
        assert!(buffer
            .contains("windows_service_start_mode{name=\"MyService\",start_mode=\"boot\"} 0.0\n"));
        assert!(buffer.contains("windows_service_status{name=\"MyService\",status=\"ok\"} 1.0\n"));
        assert!(buffer
            .contains("windows_service_status{name=\"MyService\",status=\"lost comm\"} 0.0\n"));
        assert!(buffer.ends_with("# EOF\n"));
    }

    #[test]
    fn custom_namespace() {
        let mut registry = Registry::default();
        let mut collector = ServiceCollector::new();
        let config = Config {
            namespace: "host".to_string(),
            where_clause: None,
        };
        collector.init(&mut registry, &config).unwrap();

        let mut source = MemorySource::new(vec![my_service()]);
        collector.run_cycle(&registry, &mut source).unwrap();

        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();
        assert!(buffer.contains("host_service_state{name=\"MyService\",state=\"running\"} 1.0\n"));
        assert!(!buffer.contains("windows_service"));
    }

    #[test]
    fn aborted_cycle_exposes_no_samples() {
        let mut registry = Registry::default();
        let mut collector = ServiceCollector::new();
        collector.init(&mut registry, &Config::default()).unwrap();

        let mut source = MemorySource::new(vec![my_service()])
            .fail_acquire(SourceError::new("COM initialization failed"));
        assert!(matches!(
            collector.run_cycle(&registry, &mut source),
            Err(Error::Session(_))
        ));

        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();
        assert!(!buffer.contains("MyService"));
    }
}
