use chrono::{TimeZone, Utc};
use e2e_kit::metrics::Phase;
use e2e_kit::{Aggregator, MisuseError, ReportWriter, RunConfig, RunEvent, RunReport, TestOutcome, TestStatus};
use std::fs;

const STREAM: &str = r#"
{"event":"run_start","workerCount":3,"projects":["desktop","mobile"],"engines":["chromium","webkit"],"startedAt":"2024-05-01T09:00:00Z"}
{"event":"test_end","name":"smoke: home page renders","durationMs":800,"status":"passed","project":"desktop"}
{"event":"test_end","name":"search returns results","durationMs":1500,"status":"flaky","retries":1,"failureCategory":"network"}
{"event":"test_end","name":"account settings save","durationMs":30000,"status":"failed","errorMessage":"Timeout 30000ms exceeded","failureCategory":"timeout"}
{"event":"test_end","name":"mobile navigation drawer","durationMs":0,"status":"skipped"}
{"event":"test_end","name":"login with valid user","durationMs":950,"status":"passed","project":"mobile"}
{"event":"run_end","finishedAt":"2024-05-01T09:05:30Z"}
"#;

fn replay(stream: &str) -> RunReport {
    let mut aggregator = Aggregator::new();
    let mut report = None;
    for line in stream.lines().filter(|l| !l.trim().is_empty()) {
        report = aggregator.apply(RunEvent::from_json(line).unwrap()).unwrap();
    }
    assert_eq!(aggregator.phase(), Phase::Finished);
    report.unwrap()
}

#[test]
fn test_replayed_stream() {
    let report = replay(STREAM);

    assert_eq!(report.started_at, Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
    assert_eq!(report.workers, 3);
    assert_eq!(report.projects, vec!["desktop", "mobile"]);

    assert_eq!(report.total, 5);
    assert_eq!((report.passed, report.failed, report.skipped, report.flaky), (2, 1, 1, 1));

    assert_eq!(report.slowest_test.as_ref().unwrap().name, "account settings save");
    assert_eq!(report.fastest_test.as_ref().unwrap().name, "mobile navigation drawer");
    assert_eq!(report.total_duration_ms, 33_250);
    assert_eq!(report.mean_duration_ms, 6650.0);

    assert_eq!(report.coverage.feature_tags, vec!["search", "account", "navigation", "mobile"]);
    assert_eq!(report.coverage.features, 4);
    assert_eq!(report.coverage.critical_path_percent, 40);
    assert_eq!(report.coverage.cross_platform, 2);

    assert_eq!(report.stability.timeouts, 1);
    assert_eq!(report.stability.total_retries, 1);
    assert_eq!(report.stability.retried_tests, 1);
    assert_eq!(report.stability.failure_categories.get("network"), Some(&1));
    assert_eq!(report.stability.failure_categories.get("timeout"), Some(&1));
}

#[test]
fn test_report_json_shape() {
    let json = serde_json::to_value(replay(STREAM)).unwrap();

    assert_eq!(json["finishedAt"], "2024-05-01T09:05:30Z");
    assert_eq!(json["slowestTest"]["durationMs"], 30000);
    assert_eq!(json["coverage"]["criticalPathPercent"], 40);
    assert_eq!(json["stability"]["failureCategories"]["network"], 1);
}

#[test]
fn test_counts_always_sum_to_n() {
    let statuses = [TestStatus::Passed, TestStatus::Failed, TestStatus::Skipped, TestStatus::Flaky];

    for n in 0..12usize {
        let mut aggregator = Aggregator::new();
        aggregator.on_run_start(RunConfig::new()).unwrap();
        for i in 0..n {
            let status = statuses[(i * 7 + n) % statuses.len()];
            aggregator
                .on_test_end(TestOutcome::new(format!("test {}", i), (i * 13 % 5) as u64, status))
                .unwrap();
        }
        let report = aggregator.on_run_end().unwrap();

        assert_eq!(report.passed + report.failed + report.skipped + report.flaky, n);
        if n == 0 {
            assert_eq!(report.mean_duration_ms, 0.0);
        }
    }
}

#[test]
fn test_all_smoke_is_fully_critical() {
    let mut aggregator = Aggregator::new();
    aggregator.on_run_start(RunConfig::new()).unwrap();
    for i in 0..7 {
        aggregator.on_test_end(TestOutcome::passed(format!("Smoke #{}", i), 10)).unwrap();
    }
    assert_eq!(aggregator.on_run_end().unwrap().coverage.critical_path_percent, 100);
}

#[test]
fn test_second_run_end_is_misuse() {
    let mut aggregator = Aggregator::new();
    aggregator.on_run_start(RunConfig::new()).unwrap();
    aggregator.on_test_end(TestOutcome::passed("login flow", 120)).unwrap();
    aggregator.on_run_end().unwrap();

    let err = aggregator.on_run_end().unwrap_err();
    assert_eq!(err, MisuseError::AlreadyFinished { call: "on_run_end" });

    let err: e2e_kit::Error = err.into();
    assert_eq!(err.to_string(), "on_run_end called after on_run_end");
}

#[test]
fn test_persisted_report_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let report = replay(STREAM);

    let path = ReportWriter::new(dir.path()).write(&report).unwrap();
    assert_eq!(path.file_name().unwrap(), "metrics-20240501-090530.json");

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"total\": 5"));
    let restored: RunReport = serde_json::from_str(&text).unwrap();
    assert_eq!(restored, report);
}
