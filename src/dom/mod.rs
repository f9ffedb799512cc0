//! DOM-query capability
//!
//! The resolver never talks to a browser directly. It asks a [`DomQuery`]
//! implementation for candidate elements and their visibility:
//! - [`ChromePage`](crate::browser::ChromePage): a live headless Chrome tab
//! - [`DomTree`]: an in-memory DOM snapshot, used offline and in tests
//!
//! Both return candidates in document order.

pub mod element;
pub mod selector;
pub mod tree;

pub use element::ElementNode;
pub use selector::SelectorList;
pub use tree::{DomTree, NodeRef};

use crate::error::QueryError;
use regex::Regex;
use std::fmt;

/// A single lookup issued against the page
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    /// Exact match on the `data-testid` attribute
    TestId(&'a str),

    /// ARIA role plus accessible name
    Role { role: &'a str, name: &'a NamePattern },

    /// CSS selector (may be a comma separated list)
    Css(&'a str),
}

impl fmt::Display for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::TestId(id) => write!(f, "testId={}", id),
            Query::Role { role, name } => write!(f, "role={} name={}", role, name),
            Query::Css(selector) => write!(f, "css={}", selector),
        }
    }
}

/// Host-supplied access to a page's DOM.
///
/// Handles are opaque and only valid until the page mutates; callers
/// re-resolve across navigations.
pub trait DomQuery {
    type Handle: Clone + PartialEq + fmt::Debug;

    /// Find candidates matching `query`, in document order. With a scope, only
    /// descendants of the scope element are searched.
    fn find(&self, scope: Option<&Self::Handle>, query: &Query<'_>) -> Result<Vec<Self::Handle>, QueryError>;

    /// Whether the element is currently rendered and visible
    fn is_visible(&self, handle: &Self::Handle) -> Result<bool, QueryError>;

    fn click(&self, handle: &Self::Handle) -> Result<(), QueryError>;

    /// Type `text` into the element, replacing its current value
    fn fill(&self, handle: &Self::Handle, text: &str) -> Result<(), QueryError>;
}

/// Accessible-name matcher used by role lookups
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Trimmed, case-insensitive equality
    Exact(String),

    /// Case-insensitive substring
    Contains(String),

    Regex(Regex),
}

impl NamePattern {
    pub fn exact(name: impl Into<String>) -> Self {
        NamePattern::Exact(name.into())
    }

    pub fn contains(fragment: impl Into<String>) -> Self {
        NamePattern::Contains(fragment.into())
    }

    /// Compile a regular expression pattern
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(NamePattern::Regex)
    }

    /// Check an accessible name against this pattern
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(expected) => name.trim().to_lowercase() == expected.trim().to_lowercase(),
            NamePattern::Contains(fragment) => name.to_lowercase().contains(&fragment.to_lowercase()),
            NamePattern::Regex(re) => re.is_match(name),
        }
    }
}

impl From<&str> for NamePattern {
    fn from(fragment: &str) -> Self {
        NamePattern::contains(fragment)
    }
}

impl From<String> for NamePattern {
    fn from(fragment: String) -> Self {
        NamePattern::Contains(fragment)
    }
}

impl From<Regex> for NamePattern {
    fn from(re: Regex) -> Self {
        NamePattern::Regex(re)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact(name) => write!(f, "\"{}\"", name),
            NamePattern::Contains(fragment) => write!(f, "~\"{}\"", fragment),
            NamePattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let pattern = NamePattern::exact("Close");
        assert!(pattern.matches("close"));
        assert!(pattern.matches("  CLOSE "));
        assert!(!pattern.matches("Close dialog"));
    }

    #[test]
    fn test_contains_pattern() {
        let pattern: NamePattern = "search".into();
        assert!(pattern.matches("Search products"));
        assert!(pattern.matches("Site SEARCH"));
        assert!(!pattern.matches("Find"));
    }

    #[test]
    fn test_regex_pattern() {
        let pattern = NamePattern::regex(r"(?i)^sign\s*in$").unwrap();
        assert!(pattern.matches("Sign in"));
        assert!(pattern.matches("SIGNIN"));
        assert!(!pattern.matches("Sign in with Google"));

        assert!(NamePattern::regex("(unclosed").is_err());
    }

    #[test]
    fn test_query_display() {
        let name = NamePattern::exact("Submit");
        assert_eq!(Query::TestId("cart").to_string(), "testId=cart");
        assert_eq!(
            Query::Role { role: "button", name: &name }.to_string(),
            "role=button name=\"Submit\""
        );
        assert_eq!(Query::Css("#q").to_string(), "css=#q");
    }
}
