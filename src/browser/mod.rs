//! Live browser binding
//!
//! Launching and driving the browser belongs to the host test runner; this
//! module only exposes an already-open `headless_chrome` tab as a
//! [`DomQuery`](crate::dom::DomQuery) capability.

pub mod page;

pub use page::{ChromeElement, ChromePage};
