use crate::metrics::outcome::{RunConfig, TestOutcome};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One serialized lifecycle event, tagged by `event`:
///
/// ```json
/// {"event":"run_start","workerCount":4,"projects":["desktop"],"engines":["chromium"]}
/// {"event":"test_end","name":"login flow","durationMs":120,"status":"passed"}
/// {"event":"run_end"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStart {
        #[serde(flatten)]
        config: RunConfig,

        #[serde(default, rename = "startedAt", skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
    },

    TestEnd(TestOutcome),

    RunEnd {
        #[serde(default, rename = "finishedAt", skip_serializing_if = "Option::is_none")]
        finished_at: Option<DateTime<Utc>>,
    },
}

impl RunEvent {
    /// Parse one JSON line
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::RunStart { .. } => "run_start",
            RunEvent::TestEnd(_) => "test_end",
            RunEvent::RunEnd { .. } => "run_end",
        }
    }
}
