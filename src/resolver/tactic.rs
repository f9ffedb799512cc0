//! Lookup tactics
//!
//! Each tactic issues one kind of query and waits, within its sub-budget,
//! for one of the candidates to become visible. Tactics never fail hard: a
//! miss is an ordinary, inspectable value.

use crate::dom::{DomQuery, NamePattern, Query};
use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Tactic family. Declaration order is resolution priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TacticKind {
    TestId,
    Role,
    Css,
}

impl TacticKind {
    pub fn name(&self) -> &'static str {
        match self {
            TacticKind::TestId => "test-id",
            TacticKind::Role => "role",
            TacticKind::Css => "css",
        }
    }
}

/// Why a tactic produced no element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// The query returned no candidates for the whole sub-budget
    NoMatch,

    /// Candidates existed but none became visible in time
    NotVisible { candidates: usize },

    /// The query itself failed (malformed selector, stale node, ...)
    QueryFailed(QueryError),
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Miss::NoMatch => write!(f, "no match"),
            Miss::NotVisible { candidates } => write!(f, "{} candidate(s), none visible", candidates),
            Miss::QueryFailed(err) => write!(f, "query failed: {}", err),
        }
    }
}

/// Time allotted to one tactic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubBudget {
    pub limit: Duration,
    pub poll_interval: Duration,
}

/// Record of one tactic that did not produce an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TacticReport {
    pub tactic: String,
    pub kind: TacticKind,
    pub budget: Duration,
    pub miss: Miss,
}

impl fmt::Display for TacticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}ms): {}", self.tactic, self.budget.as_millis(), self.miss)
    }
}

/// One strategy in the resolver's fallback chain
pub trait Tactic<D: DomQuery> {
    fn kind(&self) -> TacticKind;

    /// Human readable form used in logs and reports
    fn describe(&self) -> String;

    fn attempt(&self, dom: &D, budget: SubBudget) -> Result<D::Handle, Miss>;
}

/// Exact `data-testid` lookup
#[derive(Debug, Clone)]
pub struct TestIdTactic {
    id: String,
}

impl TestIdTactic {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl<D: DomQuery> Tactic<D> for TestIdTactic {
    fn kind(&self) -> TacticKind {
        TacticKind::TestId
    }

    fn describe(&self) -> String {
        format!("test-id {}", self.id)
    }

    fn attempt(&self, dom: &D, budget: SubBudget) -> Result<D::Handle, Miss> {
        await_visible(dom, &Query::TestId(&self.id), budget)
    }
}

/// ARIA role plus accessible name lookup
#[derive(Debug, Clone)]
pub struct RoleTactic {
    role: String,
    name: NamePattern,
}

impl RoleTactic {
    pub fn new(role: impl Into<String>, name: NamePattern) -> Self {
        Self { role: role.into(), name }
    }
}

impl<D: DomQuery> Tactic<D> for RoleTactic {
    fn kind(&self) -> TacticKind {
        TacticKind::Role
    }

    fn describe(&self) -> String {
        format!("role {} {}", self.role, self.name)
    }

    fn attempt(&self, dom: &D, budget: SubBudget) -> Result<D::Handle, Miss> {
        let query = Query::Role {
            role: &self.role,
            name: &self.name,
        };
        await_visible(dom, &query, budget)
    }
}

/// A single CSS selector
#[derive(Debug, Clone)]
pub struct CssTactic {
    selector: String,
}

impl CssTactic {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

impl<D: DomQuery> Tactic<D> for CssTactic {
    fn kind(&self) -> TacticKind {
        TacticKind::Css
    }

    fn describe(&self) -> String {
        format!("css {}", self.selector)
    }

    fn attempt(&self, dom: &D, budget: SubBudget) -> Result<D::Handle, Miss> {
        await_visible(dom, &Query::Css(&self.selector), budget)
    }
}

/// Poll `query` until one candidate is visible or the budget is spent.
///
/// Candidates are re-queried every round and checked in document order, so
/// the first visible one wins. A zero budget still makes one full pass.
pub fn await_visible<D: DomQuery>(dom: &D, query: &Query<'_>, budget: SubBudget) -> Result<D::Handle, Miss> {
    let started = Instant::now();

    loop {
        let candidates = dom.find(None, query).map_err(|err| {
            log::debug!("{} failed: {}", query, err);
            Miss::QueryFailed(err)
        })?;

        for handle in &candidates {
            match dom.is_visible(handle) {
                Ok(true) => return Ok(handle.clone()),
                Ok(false) => {}
                Err(err) => log::debug!("Visibility check on {:?} failed: {}", handle, err),
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= budget.limit {
            return Err(if candidates.is_empty() {
                Miss::NoMatch
            } else {
                Miss::NotVisible {
                    candidates: candidates.len(),
                }
            });
        }

        std::thread::sleep(budget.poll_interval.min(budget.limit - elapsed));
    }
}
