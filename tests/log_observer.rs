use std::sync::{Arc, Mutex, Once};

use log::{Level, LevelFilter, Log, Metadata, Record};
use typed_table::ingestion::{
    LoadContext, LoadObserver, LoadOptions, LoadSeverity, LoadStats, LogObserver, StdErrObserver,
};
use typed_table::schema::{Field, Schema};
use typed_table::table::Table;
use typed_table::types::DataType;

struct Capture {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.lines
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    lines: Mutex::new(Vec::new()),
};

/// Lines logged so far that mention `needle`. Tests run concurrently, so each one filters on
/// its own source label.
fn logged(needle: &str) -> Vec<(Level, String)> {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    CAPTURE
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, line)| line.contains(needle))
        .cloned()
        .collect()
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

fn with(observer: Arc<dyn LoadObserver>, alert_at_or_above: LoadSeverity) -> LoadOptions {
    LoadOptions {
        observer: Some(observer),
        alert_at_or_above,
        ..Default::default()
    }
}

#[test]
fn log_observer_reports_success_at_info() {
    logged("");
    let opts = with(Arc::new(LogObserver), LoadSeverity::Critical);
    Table::open_path(schema(), "tests/fixtures/employees.csv", &opts).unwrap();

    let lines = logged("tests/fixtures/employees.csv");
    assert!(lines.contains(&(
        Level::Info,
        "loaded 3 rows of 3 columns from tests/fixtures/employees.csv".to_string()
    )));
}

#[test]
fn log_observer_reports_bad_data_at_error_without_alert() {
    logged("");
    let opts = with(Arc::new(LogObserver), LoadSeverity::Critical);
    Table::open_path(schema(), "tests/fixtures/bad_salary.csv", &opts).unwrap_err();

    let lines: Vec<_> = logged("tests/fixtures/bad_salary.csv")
        .into_iter()
        .filter(|(level, _)| *level == Level::Error)
        .collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].1.contains("(3 columns) failed (Error): record 3"));
    assert!(!lines[0].1.starts_with("ALERT"));
}

#[test]
fn log_observer_alerts_on_io_failure() {
    logged("");
    let opts = with(Arc::new(LogObserver), LoadSeverity::Critical);
    let missing = "tests/fixtures/missing_for_log_observer.csv";
    Table::open_path(schema(), missing, &opts).unwrap_err();

    let lines: Vec<_> = logged(missing)
        .into_iter()
        .filter(|(level, _)| *level == Level::Error)
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].1.contains("failed (Critical): io error"));
    assert!(lines[1].1.starts_with("ALERT load of"));
}

#[test]
fn stderr_observer_handles_every_callback() {
    let obs = StdErrObserver;
    let ctx = LoadContext {
        source: "stderr-observer".to_string(),
        columns: 3,
    };
    obs.on_success(&ctx, LoadStats { rows: 3 });

    let opts = with(Arc::new(StdErrObserver), LoadSeverity::Error);
    let err = Table::open(schema(), "name,salary,department\nAda,x,eng\n".as_bytes(), &opts)
        .unwrap_err();
    obs.on_failure(&ctx, LoadSeverity::of(&err), &err);
    obs.on_alert(&ctx, LoadSeverity::Critical, &err);
}
