use crate::resolver::{LookupSpec, TacticReport};
use thiserror::Error;

/// Failure of a single DOM query issued by one tactic.
///
/// These never escape the resolver: a tactic that hits one reports a
/// non-match and the next tactic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Stale element handle: {0}")]
    StaleHandle(String),

    #[error("DOM query failed: {0}")]
    Backend(String),
}

/// The only error the resolver raises.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Element not found for {spec}: {} tactic(s) exhausted", attempts.len())]
    ElementNotFound {
        spec: LookupSpec,
        attempts: Vec<TacticReport>,
    },
}

impl ResolveError {
    /// The lookup that could not be satisfied
    pub fn spec(&self) -> &LookupSpec {
        match self {
            ResolveError::ElementNotFound { spec, .. } => spec,
        }
    }

    /// One report per tactic that was tried, in the order they ran
    pub fn attempts(&self) -> &[TacticReport] {
        match self {
            ResolveError::ElementNotFound { attempts, .. } => attempts,
        }
    }
}

/// Aggregator lifecycle called out of order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MisuseError {
    #[error("{call} called before on_run_start")]
    NotStarted { call: &'static str },

    #[error("on_run_start called more than once")]
    AlreadyStarted,

    #[error("{call} called after on_run_end")]
    AlreadyFinished { call: &'static str },
}

/// Errors while persisting a finished report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Umbrella error for hosts and fixtures that mix concerns
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Misuse(#[from] MisuseError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

pub type Result<T> = std::result::Result<T, Error>;
