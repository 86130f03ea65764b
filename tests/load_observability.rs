use std::sync::{Arc, Mutex};

use typed_table::ingestion::{
    CompositeObserver, FileObserver, LoadContext, LoadObserver, LoadOptions, LoadSeverity, LoadStats,
};
use typed_table::schema::{Field, Schema};
use typed_table::table::Table;
use typed_table::types::DataType;
use typed_table::TableError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<usize>>,
    failures: Mutex<Vec<LoadSeverity>>,
    alerts: Mutex<Vec<LoadSeverity>>,
}

impl LoadObserver for RecordingObserver {
    fn on_success(&self, _ctx: &LoadContext, stats: LoadStats) {
        self.successes.lock().unwrap().push(stats.rows);
    }

    fn on_failure(&self, _ctx: &LoadContext, severity: LoadSeverity, _error: &TableError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &LoadContext, severity: LoadSeverity, _error: &TableError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new(vec![
            Field::new("name"),
            Field::typed("salary", DataType::Int64),
            Field::new("department"),
        ])
        .unwrap(),
    )
}

fn options(obs: Arc<RecordingObserver>) -> LoadOptions {
    LoadOptions {
        observer: Some(obs),
        alert_at_or_above: LoadSeverity::Critical,
        ..Default::default()
    }
}

#[test]
fn observer_receives_success_with_row_count() {
    let obs = Arc::new(RecordingObserver::default());
    Table::open_path(schema(), "tests/fixtures/employees.csv", &options(obs.clone())).unwrap();

    assert_eq!(obs.successes.lock().unwrap().clone(), vec![3]);
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());

    // Missing file -> Io error -> Critical
    let _ = Table::open_path(schema(), "tests/fixtures/does_not_exist.csv", &options(obs.clone()))
        .unwrap_err();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![LoadSeverity::Critical]);
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![LoadSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_bad_data() {
    let obs = Arc::new(RecordingObserver::default());

    // Coercion failure -> Error severity (not Critical) -> should not alert
    let _ = Table::open_path(schema(), "tests/fixtures/bad_salary.csv", &options(obs.clone()))
        .unwrap_err();

    assert_eq!(obs.failures.lock().unwrap().clone(), vec![LoadSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn composite_and_file_observers_fan_out() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("load.log");
    let recording = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn LoadObserver>> = vec![
        recording.clone(),
        Arc::new(FileObserver::new(&log_path)),
    ];
    let composite = CompositeObserver::new(observers);
    let opts = LoadOptions {
        observer: Some(Arc::new(composite)),
        alert_at_or_above: LoadSeverity::Error,
        ..Default::default()
    };

    let _ = Table::open(schema(), "name,salary\n".as_bytes(), &opts).unwrap_err();

    assert_eq!(recording.alerts.lock().unwrap().clone(), vec![LoadSeverity::Error]);
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("fail severity=Error source=<reader> columns=3"));
    assert!(log.contains("ALERT severity=Error"));
}
