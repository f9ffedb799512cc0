//! Run report and the naming heuristics behind its coverage figures

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::{JsonSchema, Schema};
use serde::{Deserialize, Serialize};

/// Name fragments that mark a test as covering a product feature
pub const FEATURE_MARKERS: &[&str] = &["navigation", "search", "account", "mobile"];

/// Name fragments that mark a test as part of the critical path
pub const CRITICAL_MARKERS: &[&str] = &["critical", "smoke", "login", "checkout"];

/// Feature markers found in a test name, in marker order
pub fn feature_tags(name: &str) -> impl Iterator<Item = &'static str> {
    let name = name.to_lowercase();
    FEATURE_MARKERS.iter().copied().filter(move |marker| name.contains(marker))
}

pub fn is_critical(name: &str) -> bool {
    let name = name.to_lowercase();
    CRITICAL_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Share of `matches` in `total` as a whole percentage, 0 for an empty run
pub fn percent(matches: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * matches as f64 / total as f64).round() as u32
}

/// A named test and its duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestTiming {
    pub name: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    /// Number of distinct feature tags observed
    pub features: usize,

    /// Distinct feature tags, in first-seen order
    pub feature_tags: Vec<String>,

    pub critical_path_percent: u32,

    /// Number of distinct browser engines configured
    pub cross_platform: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stability {
    pub timeouts: usize,
    pub total_retries: u64,

    /// Tests that needed at least one retry
    pub retried_tests: usize,

    /// Failure tags of failed and flaky tests
    pub failure_categories: IndexMap<String, usize>,
}

/// Final summary of one test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    pub workers: u32,
    pub projects: Vec<String>,
    pub engines: Vec<String>,

    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub flaky: usize,

    pub slowest_test: Option<TestTiming>,
    pub fastest_test: Option<TestTiming>,
    pub mean_duration_ms: f64,
    pub total_duration_ms: u64,

    pub coverage: Coverage,
    pub stability: Stability,
}

impl RunReport {
    /// JSON schema of the serialized report
    pub fn json_schema() -> Schema {
        schemars::schema_for!(RunReport)
    }
}
