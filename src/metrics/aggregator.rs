use crate::error::MisuseError;
use crate::metrics::events::RunEvent;
use crate::metrics::outcome::{RunConfig, TestOutcome, TestStatus};
use crate::metrics::report::{self, Coverage, RunReport, Stability, TestTiming};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};

/// Lifecycle phase of an [`Aggregator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Finished,
}

/// State of the run currently being observed
#[derive(Debug, Clone)]
struct RunContext {
    config: RunConfig,
    started_at: DateTime<Utc>,
    outcomes: Vec<TestOutcome>,
    passed: usize,
    failed: usize,
    skipped: usize,
    flaky: usize,
    slowest: Option<TestTiming>,
    fastest: Option<TestTiming>,
    timeouts: usize,
    total_retries: u64,
}

impl RunContext {
    fn new(config: RunConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            config,
            started_at,
            outcomes: Vec::new(),
            passed: 0,
            failed: 0,
            skipped: 0,
            flaky: 0,
            slowest: None,
            fastest: None,
            timeouts: 0,
            total_retries: 0,
        }
    }

    fn record(&mut self, outcome: TestOutcome) {
        match outcome.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Flaky => self.flaky += 1,
        }

        // strict comparisons: ties keep the first-seen test
        if self.slowest.as_ref().is_none_or(|t| outcome.duration_ms > t.duration_ms) {
            self.slowest = Some(timing(&outcome));
        }
        if self.fastest.as_ref().is_none_or(|t| outcome.duration_ms < t.duration_ms) {
            self.fastest = Some(timing(&outcome));
        }

        if outcome.is_timeout() {
            self.timeouts += 1;
        }
        self.total_retries += u64::from(outcome.retries);

        self.outcomes.push(outcome);
    }

    fn finalize(&self, finished_at: DateTime<Utc>) -> RunReport {
        let total = self.outcomes.len();
        // exact sum, clamped only when reported
        let exact_total: u128 = self.outcomes.iter().map(|o| u128::from(o.duration_ms)).sum();
        let total_duration_ms = u64::try_from(exact_total).unwrap_or(u64::MAX);
        let mean_duration_ms = if total == 0 {
            0.0
        } else {
            exact_total as f64 / total as f64
        };

        let mut feature_tags: IndexSet<&'static str> = IndexSet::new();
        let mut critical = 0;
        let mut failure_categories: IndexMap<String, usize> = IndexMap::new();

        for outcome in &self.outcomes {
            feature_tags.extend(report::feature_tags(&outcome.name));

            if report::is_critical(&outcome.name) {
                critical += 1;
            }

            if matches!(outcome.status, TestStatus::Failed | TestStatus::Flaky) {
                if let Some(category) = &outcome.failure_category {
                    *failure_categories.entry(category.clone()).or_default() += 1;
                }
            }
        }

        let engines: IndexSet<&str> = self.config.engines.iter().map(String::as_str).collect();

        RunReport {
            started_at: self.started_at,
            finished_at,
            workers: self.config.worker_count,
            projects: self.config.projects.clone(),
            engines: self.config.engines.clone(),
            total,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            flaky: self.flaky,
            slowest_test: self.slowest.clone(),
            fastest_test: self.fastest.clone(),
            mean_duration_ms,
            total_duration_ms,
            coverage: Coverage {
                features: feature_tags.len(),
                feature_tags: feature_tags.iter().map(|tag| tag.to_string()).collect(),
                critical_path_percent: report::percent(critical, total),
                cross_platform: engines.len(),
            },
            stability: Stability {
                timeouts: self.timeouts,
                total_retries: self.total_retries,
                retried_tests: self.outcomes.iter().filter(|o| o.retries > 0).count(),
                failure_categories,
            },
        }
    }
}

fn timing(outcome: &TestOutcome) -> TestTiming {
    TestTiming {
        name: outcome.name.clone(),
        duration_ms: outcome.duration_ms,
    }
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Idle,
    Running(Box<RunContext>),
    Finished,
}

/// Builds a [`RunReport`] from the lifecycle events of one test run.
///
/// Calls must follow `on_run_start`, any number of `on_test_end`, then
/// `on_run_end`. Anything else is a [`MisuseError`] and leaves the
/// aggregator untouched. The host is expected to serialize calls.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    state: State,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Running(_) => Phase::Running,
            State::Finished => Phase::Finished,
        }
    }

    /// Outcomes recorded so far, in arrival order
    pub fn outcomes(&self) -> &[TestOutcome] {
        match &self.state {
            State::Running(ctx) => &ctx.outcomes,
            _ => &[],
        }
    }

    pub fn on_run_start(&mut self, config: RunConfig) -> Result<(), MisuseError> {
        self.on_run_start_at(config, Utc::now())
    }

    /// Start the run with an explicit start time
    pub fn on_run_start_at(&mut self, config: RunConfig, started_at: DateTime<Utc>) -> Result<(), MisuseError> {
        match self.state {
            State::Idle => {}
            State::Running(_) => return Err(MisuseError::AlreadyStarted),
            State::Finished => return Err(MisuseError::AlreadyFinished { call: "on_run_start" }),
        }

        log::info!(
            "Run started: {} worker(s), projects {:?}, engines {:?}",
            config.worker_count,
            config.projects,
            config.engines
        );
        self.state = State::Running(Box::new(RunContext::new(config, started_at)));
        Ok(())
    }

    pub fn on_test_end(&mut self, outcome: TestOutcome) -> Result<(), MisuseError> {
        let ctx = self.running("on_test_end")?;

        log::debug!(
            "Test finished: {} ({}, {}ms, {} retries)",
            outcome.name,
            outcome.status.as_str(),
            outcome.duration_ms,
            outcome.retries
        );
        ctx.record(outcome);
        Ok(())
    }

    pub fn on_run_end(&mut self) -> Result<RunReport, MisuseError> {
        self.on_run_end_at(Utc::now())
    }

    /// Finish the run with an explicit end time
    pub fn on_run_end_at(&mut self, finished_at: DateTime<Utc>) -> Result<RunReport, MisuseError> {
        let report = self.running("on_run_end")?.finalize(finished_at);
        self.state = State::Finished;

        log::info!(
            "Run finished: {} test(s), {} passed, {} failed, {} skipped, {} flaky",
            report.total,
            report.passed,
            report.failed,
            report.skipped,
            report.flaky
        );
        Ok(report)
    }

    /// Drive the lifecycle from a serialized event. Returns the report on
    /// `run_end`.
    pub fn apply(&mut self, event: RunEvent) -> Result<Option<RunReport>, MisuseError> {
        match event {
            RunEvent::RunStart { config, started_at } => {
                self.on_run_start_at(config, started_at.unwrap_or_else(Utc::now))?;
                Ok(None)
            }
            RunEvent::TestEnd(outcome) => {
                self.on_test_end(outcome)?;
                Ok(None)
            }
            RunEvent::RunEnd { finished_at } => self.on_run_end_at(finished_at.unwrap_or_else(Utc::now)).map(Some),
        }
    }

    fn running(&mut self, call: &'static str) -> Result<&mut RunContext, MisuseError> {
        match &mut self.state {
            State::Running(ctx) => Ok(ctx.as_mut()),
            State::Idle => Err(MisuseError::NotStarted { call }),
            State::Finished => Err(MisuseError::AlreadyFinished { call }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> Aggregator {
        let mut aggregator = Aggregator::new();
        aggregator
            .on_run_start(RunConfig::new().worker_count(2).engine("chromium"))
            .unwrap();
        aggregator
    }

    #[test]
    fn test_empty_run() {
        let mut aggregator = started();
        let report = aggregator.on_run_end().unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.mean_duration_ms, 0.0);
        assert_eq!(report.coverage.critical_path_percent, 0);
        assert_eq!(report.slowest_test, None);
        assert_eq!(report.fastest_test, None);
        assert_eq!(report.coverage.cross_platform, 1);
    }

    #[test]
    fn test_login_and_checkout() {
        let mut aggregator = started();
        aggregator.on_test_end(TestOutcome::passed("login flow", 120)).unwrap();
        aggregator.on_test_end(TestOutcome::failed("checkout flow", 340)).unwrap();
        let report = aggregator.on_run_end().unwrap();

        assert_eq!(
            report.slowest_test,
            Some(TestTiming {
                name: "checkout flow".into(),
                duration_ms: 340
            })
        );
        assert_eq!(report.fastest_test.unwrap().name, "login flow");
        assert_eq!(report.coverage.critical_path_percent, 100);
        assert_eq!(report.coverage.features, 0);
        assert_eq!(report.mean_duration_ms, 230.0);
        assert_eq!(report.total_duration_ms, 460);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let mut aggregator = started();
        aggregator.on_test_end(TestOutcome::passed("a", u64::MAX)).unwrap();
        aggregator.on_test_end(TestOutcome::passed("b", u64::MAX)).unwrap();
        aggregator.on_test_end(TestOutcome::passed("c", 1)).unwrap();
        let report = aggregator.on_run_end().unwrap();

        assert_eq!(report.total_duration_ms, u64::MAX);
        let expected_mean = (2.0 * u64::MAX as f64 + 1.0) / 3.0;
        assert!((report.mean_duration_ms - expected_mean).abs() / expected_mean < 1e-9);
        assert_eq!(report.slowest_test.unwrap().name, "a");
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let mut aggregator = started();
        for name in ["a", "b", "c"] {
            aggregator.on_test_end(TestOutcome::passed(name, 50)).unwrap();
        }
        let report = aggregator.on_run_end().unwrap();

        assert_eq!(report.slowest_test.unwrap().name, "a");
        assert_eq!(report.fastest_test.unwrap().name, "a");
    }

    #[test]
    fn test_stability_counters() {
        let mut aggregator = started();
        aggregator
            .on_test_end(TestOutcome::failed("search results", 30_000).with_error_message("Test timeout of 30000ms exceeded"))
            .unwrap();
        aggregator
            .on_test_end(TestOutcome::flaky("account page", 900).with_retries(2).with_failure_category("network"))
            .unwrap();
        aggregator
            .on_test_end(TestOutcome::failed("mobile menu", 400).with_failure_category("assertion"))
            .unwrap();
        aggregator
            .on_test_end(TestOutcome::passed("navigation bar", 80).with_retries(1).with_failure_category("ignored"))
            .unwrap();
        let report = aggregator.on_run_end().unwrap();

        assert_eq!(report.stability.timeouts, 1);
        assert_eq!(report.stability.total_retries, 3);
        assert_eq!(report.stability.retried_tests, 2);
        let categories: Vec<(&str, usize)> = report
            .stability
            .failure_categories
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        assert_eq!(categories, vec![("network", 1), ("assertion", 1)]);

        assert_eq!(report.coverage.feature_tags, vec!["search", "account", "mobile", "navigation"]);
        assert_eq!(report.coverage.features, 4);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let mut aggregator = started();
        let outcomes = [
            TestOutcome::passed("a", 1),
            TestOutcome::failed("b", 2),
            TestOutcome::skipped("c"),
            TestOutcome::flaky("d", 4),
            TestOutcome::passed("e", 5),
        ];
        for outcome in outcomes {
            aggregator.on_test_end(outcome).unwrap();
        }
        assert_eq!(aggregator.outcomes().len(), 5);

        let report = aggregator.on_run_end().unwrap();
        assert_eq!(report.passed + report.failed + report.skipped + report.flaky, report.total);
        assert_eq!(report.total, 5);
        assert_eq!(report.passed, 2);
    }

    #[test]
    fn test_duplicate_engines_counted_once() {
        let mut aggregator = Aggregator::new();
        aggregator
            .on_run_start(RunConfig::new().engine("chromium").engine("firefox").engine("chromium"))
            .unwrap();
        let report = aggregator.on_run_end().unwrap();

        assert_eq!(report.coverage.cross_platform, 2);
        assert_eq!(report.engines.len(), 3);
    }

    #[test]
    fn test_misuse() {
        let mut aggregator = Aggregator::new();
        assert_eq!(
            aggregator.on_test_end(TestOutcome::passed("a", 1)),
            Err(MisuseError::NotStarted { call: "on_test_end" })
        );
        assert_eq!(aggregator.on_run_end().unwrap_err(), MisuseError::NotStarted { call: "on_run_end" });
        assert_eq!(aggregator.phase(), Phase::Idle);

        aggregator.on_run_start(RunConfig::new()).unwrap();
        assert_eq!(aggregator.on_run_start(RunConfig::new()), Err(MisuseError::AlreadyStarted));
        assert_eq!(aggregator.phase(), Phase::Running);

        aggregator.on_run_end().unwrap();
        assert_eq!(
            aggregator.on_run_end().unwrap_err(),
            MisuseError::AlreadyFinished { call: "on_run_end" }
        );
        assert_eq!(
            aggregator.on_test_end(TestOutcome::passed("late", 1)),
            Err(MisuseError::AlreadyFinished { call: "on_test_end" })
        );
        assert_eq!(aggregator.phase(), Phase::Finished);
    }

    #[test]
    fn test_misuse_keeps_recorded_outcomes() {
        let mut aggregator = started();
        aggregator.on_test_end(TestOutcome::passed("smoke", 10)).unwrap();
        assert!(aggregator.on_run_start(RunConfig::new()).is_err());

        assert_eq!(aggregator.outcomes().len(), 1);
        assert_eq!(aggregator.on_run_end().unwrap().workers, 2);
    }

    #[test]
    fn test_apply_events() {
        let mut aggregator = Aggregator::new();
        assert_eq!(aggregator.apply(RunEvent::RunStart { config: RunConfig::new(), started_at: None }), Ok(None));
        assert_eq!(aggregator.apply(RunEvent::TestEnd(TestOutcome::passed("smoke", 10))), Ok(None));

        let report = aggregator.apply(RunEvent::RunEnd { finished_at: None }).unwrap().unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.coverage.critical_path_percent, 100);
    }
}
