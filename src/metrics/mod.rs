//! Test-run metrics
//!
//! The [`Aggregator`] consumes the lifecycle events of one run (start, one
//! event per finished test, end) and produces a [`RunReport`]: counts by
//! status, duration extremes, coverage heuristics and stability counters.
//! Coverage figures come from keyword matching on test names, see
//! [`FEATURE_MARKERS`] and [`CRITICAL_MARKERS`].
//!
//! ```rust
//! use e2e_kit::metrics::{Aggregator, RunConfig, TestOutcome};
//!
//! # fn main() -> Result<(), e2e_kit::MisuseError> {
//! let mut aggregator = Aggregator::new();
//! aggregator.on_run_start(RunConfig::new().worker_count(2).engine("chromium"))?;
//! aggregator.on_test_end(TestOutcome::passed("login flow", 120))?;
//! aggregator.on_test_end(TestOutcome::failed("checkout flow", 340))?;
//!
//! let report = aggregator.on_run_end()?;
//! assert_eq!(report.coverage.critical_path_percent, 100);
//! # Ok(())
//! # }
//! ```
//!
//! Persisting the report is left to the host; [`ReportWriter`] is one way
//! to do it.

pub mod aggregator;
pub mod events;
pub mod outcome;
pub mod persist;
pub mod report;

pub use aggregator::{Aggregator, Phase};
pub use events::RunEvent;
pub use outcome::{RunConfig, TestOutcome, TestStatus};
pub use persist::ReportWriter;
pub use report::{CRITICAL_MARKERS, Coverage, FEATURE_MARKERS, RunReport, Stability, TestTiming};
