//! Adaptive element resolution
//!
//! A [`LookupSpec`] expands into an ordered chain of [`Tactic`]s
//! (test-id, then role + accessible name, then CSS candidates). The
//! [`Resolver`] runs them in order against a [`DomQuery`] and returns the
//! first visible match. Each tactic gets an equal share of whatever budget
//! is left when it starts, so the last tactic inherits everything the
//! earlier ones did not spend.

pub mod overlay;
pub mod spec;
pub mod tactic;

pub use overlay::{DismissReport, Dismissal, Undismissed, dismiss_transient_overlays};
pub use spec::LookupSpec;
pub use tactic::{
    CssTactic, Miss, RoleTactic, SubBudget, Tactic, TacticKind, TacticReport, TestIdTactic, await_visible,
};

use crate::dom::DomQuery;
use crate::error::ResolveError;
use std::time::{Duration, Instant};

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Delay between visibility polls inside a tactic (default: 50ms)
    pub poll_interval: Duration,

    /// Budget used by [`Resolver::locate`] (default: 5s)
    pub default_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            default_timeout: Duration::from_secs(5),
        }
    }
}

impl ResolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the poll interval (at least 1ms)
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Builder method: set the default timeout
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// A successful resolution and how it was reached
#[derive(Debug, Clone)]
pub struct Resolution<H> {
    pub handle: H,

    /// Description of the tactic that matched
    pub tactic: String,

    pub kind: TacticKind,

    /// Tactics that ran before the winner, in order
    pub misses: Vec<TacticReport>,

    pub elapsed: Duration,
}

/// Locates elements through an ordered fallback chain of tactics.
///
/// Holds no per-page state, so one resolver can serve many pages
/// concurrently.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    /// Resolve `spec` within `timeout`
    pub fn resolve<D: DomQuery>(&self, dom: &D, spec: &LookupSpec, timeout: Duration) -> Result<D::Handle, ResolveError> {
        self.resolve_traced(dom, spec, timeout).map(|resolution| resolution.handle)
    }

    /// Resolve `spec` within the configured default timeout
    pub fn locate<D: DomQuery>(&self, dom: &D, spec: &LookupSpec) -> Result<D::Handle, ResolveError> {
        self.resolve(dom, spec, self.options.default_timeout)
    }

    /// Like [`resolve`](Self::resolve), also reporting which tactic matched
    pub fn resolve_traced<D: DomQuery>(
        &self,
        dom: &D,
        spec: &LookupSpec,
        timeout: Duration,
    ) -> Result<Resolution<D::Handle>, ResolveError> {
        self.resolve_with(dom, spec, &spec.tactics::<D>(), timeout)
    }

    /// Run an explicit tactic chain. `spec` is only used for diagnostics.
    pub fn resolve_with<D: DomQuery>(
        &self,
        dom: &D,
        spec: &LookupSpec,
        tactics: &[Box<dyn Tactic<D>>],
        timeout: Duration,
    ) -> Result<Resolution<D::Handle>, ResolveError> {
        let started = Instant::now();
        let mut remaining = timeout;
        let mut misses = Vec::with_capacity(tactics.len());

        for (i, tactic) in tactics.iter().enumerate() {
            let share = remaining / (tactics.len() - i) as u32;
            let attempt_started = Instant::now();

            let budget = SubBudget {
                limit: share,
                poll_interval: self.options.poll_interval,
            };

            match tactic.attempt(dom, budget) {
                Ok(handle) => {
                    log::info!("Resolved {} using {}", spec, tactic.describe());
                    return Ok(Resolution {
                        handle,
                        tactic: tactic.describe(),
                        kind: tactic.kind(),
                        misses,
                        elapsed: started.elapsed(),
                    });
                }
                Err(miss) => {
                    log::debug!("Tactic {} missed: {}", tactic.describe(), miss);
                    misses.push(TacticReport {
                        tactic: tactic.describe(),
                        kind: tactic.kind(),
                        budget: share,
                        miss,
                    });
                }
            }

            remaining = remaining.saturating_sub(attempt_started.elapsed());
        }

        log::warn!("Element not found for {} after {} tactic(s)", spec, misses.len());
        Err(ResolveError::ElementNotFound {
            spec: spec.clone(),
            attempts: misses,
        })
    }

    /// Best-effort sweep that closes visible popups, modals and consent
    /// banners. Cheap no-op when none are present.
    pub fn dismiss_transient_overlays<D: DomQuery>(&self, dom: &D) -> DismissReport {
        dismiss_transient_overlays(dom)
    }
}
