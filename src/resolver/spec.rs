use crate::dom::{DomQuery, NamePattern};
use crate::resolver::tactic::{CssTactic, RoleTactic, Tactic, TestIdTactic};
use std::fmt;

/// Semantic description of the element to locate
#[derive(Debug, Clone)]
pub enum LookupSpec {
    /// Exact `data-testid` match
    TestId(String),

    /// ARIA role plus accessible-name pattern
    Role { role: String, name: NamePattern },

    /// CSS selectors tried in order; the first that yields a visible match wins
    Css { candidates: Vec<String> },

    /// Several descriptions of the same element. Their tactics are merged and
    /// ordered test-id, then role, then css.
    AnyOf(Vec<LookupSpec>),
}

impl LookupSpec {
    pub fn test_id(value: impl Into<String>) -> Self {
        LookupSpec::TestId(value.into())
    }

    pub fn role(role: impl Into<String>, name: impl Into<NamePattern>) -> Self {
        LookupSpec::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn css<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LookupSpec::Css {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn any_of(specs: impl IntoIterator<Item = LookupSpec>) -> Self {
        LookupSpec::AnyOf(specs.into_iter().collect())
    }

    /// Expand into the ordered tactic chain
    pub fn tactics<D: DomQuery>(&self) -> Vec<Box<dyn Tactic<D>>> {
        let mut tactics = Vec::new();
        self.collect_tactics(&mut tactics);
        // stable: keeps candidate order within a kind
        tactics.sort_by_key(|tactic| tactic.kind());
        tactics
    }

    fn collect_tactics<D: DomQuery>(&self, out: &mut Vec<Box<dyn Tactic<D>>>) {
        match self {
            LookupSpec::TestId(id) => out.push(Box::new(TestIdTactic::new(id.clone()))),
            LookupSpec::Role { role, name } => out.push(Box::new(RoleTactic::new(role.clone(), name.clone()))),
            LookupSpec::Css { candidates } => {
                for selector in candidates {
                    out.push(Box::new(CssTactic::new(selector.clone())));
                }
            }
            LookupSpec::AnyOf(specs) => {
                for spec in specs {
                    spec.collect_tactics(out);
                }
            }
        }
    }
}

impl fmt::Display for LookupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupSpec::TestId(id) => write!(f, "testId \"{}\"", id),
            LookupSpec::Role { role, name } => write!(f, "role {} named {}", role, name),
            LookupSpec::Css { candidates } => write!(f, "css [{}]", candidates.join(", ")),
            LookupSpec::AnyOf(specs) => {
                let parts: Vec<String> = specs.iter().map(ToString::to_string).collect();
                write!(f, "any of ({})", parts.join("; "))
            }
        }
    }
}
