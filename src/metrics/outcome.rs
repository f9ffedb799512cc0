use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Terminal status of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    /// Failed at least once, then passed on retry
    Flaky,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
            TestStatus::Flaky => "flaky",
        }
    }
}

/// Record of one completed test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub name: String,

    pub duration_ms: u64,

    pub status: TestStatus,

    #[serde(default)]
    pub retries: u32,

    /// Free-form failure tag ("timeout", "assertion", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Logical grouping the test ran under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl TestOutcome {
    pub fn new(name: impl Into<String>, duration_ms: u64, status: TestStatus) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            status,
            retries: 0,
            failure_category: None,
            error_message: None,
            project: None,
        }
    }

    pub fn passed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, duration_ms, TestStatus::Passed)
    }

    pub fn failed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, duration_ms, TestStatus::Failed)
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        Self::new(name, 0, TestStatus::Skipped)
    }

    pub fn flaky(name: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(name, duration_ms, TestStatus::Flaky)
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_failure_category(mut self, category: impl Into<String>) -> Self {
        self.failure_category = Some(category.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// A failed test whose message or category indicates a timeout
    pub fn is_timeout(&self) -> bool {
        if self.status != TestStatus::Failed {
            return false;
        }

        let by_category = self
            .failure_category
            .as_deref()
            .is_some_and(|category| category.eq_ignore_ascii_case("timeout"));

        let by_message = self.error_message.as_deref().is_some_and(|message| {
            let message = message.to_lowercase();
            message.contains("timeout") || message.contains("timed out")
        });

        by_category || by_message
    }
}

/// Run configuration handed to [`Aggregator::on_run_start`](super::Aggregator::on_run_start)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    #[serde(default)]
    pub worker_count: u32,

    #[serde(default)]
    pub projects: Vec<String>,

    /// Browser engines under test ("chromium", "firefox", "webkit")
    #[serde(default)]
    pub engines: Vec<String>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the worker count
    pub fn worker_count(mut self, workers: u32) -> Self {
        self.worker_count = workers;
        self
    }

    /// Builder method: add a project
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.projects.push(project.into());
        self
    }

    /// Builder method: add a browser engine
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engines.push(engine.into());
        self
    }
}
