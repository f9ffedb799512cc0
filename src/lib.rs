//! # e2e-kit
//!
//! Support layer for end-to-end browser test suites.
//!
//! ## Features
//!
//! - **Adaptive element resolution**: locate elements through an ordered fallback chain
//!   (test id, then ARIA role + accessible name, then CSS candidates) under a shared time budget
//! - **Overlay dismissal**: best-effort sweep of popups, modals and cookie banners
//! - **Auth fixture**: sign in through whatever login form the page renders
//! - **Run metrics**: aggregate per-test lifecycle events into a structured run report
//!
//! ## Resolving Elements
//!
//! The resolver works against any [`DomQuery`] implementation. [`ChromePage`] binds it to a
//! live `headless_chrome` tab; [`DomTree`] is an in-memory snapshot for offline use.
//!
//! ```rust,no_run
//! use e2e_kit::{ChromePage, LookupSpec, NamePattern, Resolver};
//! use headless_chrome::Browser;
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let browser = Browser::default()?;
//! let tab = browser.new_tab()?;
//! tab.navigate_to("https://example.com")?.wait_until_navigated()?;
//!
//! let page = ChromePage::new(tab);
//! let resolver = Resolver::default();
//! resolver.dismiss_transient_overlays(&page);
//!
//! let search = LookupSpec::any_of([
//!     LookupSpec::test_id("search-box"),
//!     LookupSpec::role("textbox", NamePattern::contains("search")),
//!     LookupSpec::css(["#search", "input[name=q]"]),
//! ]);
//! let _search_box = resolver.resolve(&page, &search, Duration::from_secs(5))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Aggregating a Run
//!
//! ```rust
//! use e2e_kit::{Aggregator, RunConfig, TestOutcome};
//!
//! # fn main() -> e2e_kit::Result<()> {
//! let mut aggregator = Aggregator::new();
//! aggregator.on_run_start(RunConfig::new().worker_count(4).engine("chromium").engine("webkit"))?;
//! aggregator.on_test_end(TestOutcome::passed("smoke: home page", 850))?;
//!
//! let report = aggregator.on_run_end()?;
//! assert_eq!(report.coverage.cross_platform, 2);
//! # Ok(())
//! # }
//! ```
//!
//! The `run-report` binary (feature `cli`) does the same for a JSON-lines event stream.
//!
//! ## Module Overview
//!
//! - [`dom`]: the DOM-query capability and the in-memory snapshot
//! - [`browser`]: the capability bound to a live Chrome tab
//! - [`resolver`]: lookup specs, tactics, budget policy and overlay dismissal
//! - [`metrics`]: test outcomes, the aggregator, run reports and persistence
//! - [`fixtures`]: authentication fixture
//! - [`error`]: error types and result alias

pub mod browser;
pub mod dom;
pub mod error;
pub mod fixtures;
pub mod metrics;
pub mod resolver;

pub use browser::{ChromeElement, ChromePage};
pub use dom::{DomQuery, DomTree, ElementNode, NamePattern, NodeRef, Query};
pub use error::{Error, MisuseError, QueryError, ReportError, ResolveError, Result};
pub use fixtures::{Credentials, sign_in};
pub use metrics::{Aggregator, ReportWriter, RunConfig, RunEvent, RunReport, TestOutcome, TestStatus};
pub use resolver::{DismissReport, LookupSpec, Resolution, Resolver, ResolverOptions};
