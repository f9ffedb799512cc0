//! Minimal CSS selector engine for in-memory snapshots
//!
//! Supports type, universal, `#id`, `.class` and attribute selectors
//! (`[a]`, `[a=v]`, `[a~=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`), descendant and
//! child combinators, and comma separated lists. Pseudo-classes are rejected.

use crate::dom::element::ElementNode;
use crate::error::QueryError;
use std::iter::Peekable;
use std::str::Chars;

/// A parsed, comma separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let invalid = |reason: &str| QueryError::InvalidSelector {
            selector: input.to_string(),
            reason: reason.to_string(),
        };

        let parts = split_top_level(input).map_err(|reason| invalid(reason))?;
        let mut selectors = Vec::with_capacity(parts.len());
        for part in parts {
            selectors.push(parse_complex(part).map_err(|reason| invalid(&reason))?);
        }

        Ok(Self { selectors })
    }

    /// Check `node`, whose ancestors (root first) are `ancestors`
    pub fn matches(&self, node: &ElementNode, ancestors: &[&ElementNode]) -> bool {
        self.selectors.iter().any(|selector| selector.matches(node, ancestors))
    }
}

impl ComplexSelector {
    fn matches(&self, node: &ElementNode, ancestors: &[&ElementNode]) -> bool {
        let last = self.compounds.len() - 1;
        self.compounds[last].matches(node) && self.matches_from(last, ancestors)
    }

    /// `compounds[idx]` already matched an element whose ancestors are `ancestors`
    fn matches_from(&self, idx: usize, ancestors: &[&ElementNode]) -> bool {
        if idx == 0 {
            return true;
        }

        let prev = &self.compounds[idx - 1];
        match self.combinators[idx - 1] {
            Combinator::Child => match ancestors.split_last() {
                Some((parent, rest)) => prev.matches(parent) && self.matches_from(idx - 1, rest),
                None => false,
            },
            Combinator::Descendant => (0..ancestors.len())
                .rev()
                .any(|i| prev.matches(ancestors[i]) && self.matches_from(idx - 1, &ancestors[..i])),
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, node: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if !node.is_tag(tag) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if node.id() != Some(id.as_str()) {
                return false;
            }
        }

        self.classes.iter().all(|class| node.has_class(class)) && self.attrs.iter().all(|attr| attr.matches(node))
    }
}

impl AttrSelector {
    fn matches(&self, node: &ElementNode) -> bool {
        let Some(actual) = node.get_attribute(&self.name) else {
            return false;
        };
        let expected = self.value.as_str();

        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_whitespace().any(|word| word == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

/// Split on commas that are outside brackets and quotes
fn split_top_level(input: &str) -> Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1).ok_or("unbalanced ']'")?,
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated string");
    }
    if depth != 0 {
        return Err("unbalanced '['");
    }
    parts.push(&input[start..]);

    if parts.iter().any(|part| part.trim().is_empty()) {
        return Err("empty selector");
    }
    Ok(parts)
}

fn parse_complex(input: &str) -> Result<ComplexSelector, String> {
    let mut chars = input.trim().chars().peekable();
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();

    loop {
        compounds.push(parse_compound(&mut chars)?);

        let saw_space = skip_whitespace(&mut chars);
        match chars.peek() {
            None => break,
            Some('>') => {
                chars.next();
                skip_whitespace(&mut chars);
                combinators.push(Combinator::Child);
            }
            Some('+' | '~') => return Err("sibling combinators are not supported".to_string()),
            Some(_) if saw_space => combinators.push(Combinator::Descendant),
            Some(c) => return Err(format!("unexpected character '{}'", c)),
        }
    }

    Ok(ComplexSelector { compounds, combinators })
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let mut universal = false;
    let mut first = true;

    while let Some(&c) = chars.peek() {
        match c {
            '*' if first => {
                chars.next();
                universal = true;
            }
            c if first && is_ident_char(c) => {
                compound.tag = Some(read_ident(chars)?.to_ascii_lowercase());
            }
            '#' => {
                chars.next();
                compound.id = Some(read_ident(chars)?);
            }
            '.' => {
                chars.next();
                compound.classes.push(read_ident(chars)?);
            }
            '[' => {
                chars.next();
                compound.attrs.push(parse_attr(chars)?);
            }
            ':' => return Err("pseudo-classes are not supported".to_string()),
            c if c.is_whitespace() || c == '>' || c == '+' || c == '~' => break,
            c => return Err(format!("unexpected character '{}'", c)),
        }
        first = false;
    }

    if compound.is_empty() && !universal {
        return Err("expected a selector".to_string());
    }
    Ok(compound)
}

fn parse_attr(chars: &mut Peekable<Chars<'_>>) -> Result<AttrSelector, String> {
    skip_whitespace(chars);
    let name = read_ident(chars)?.to_ascii_lowercase();
    skip_whitespace(chars);

    let op = match chars.next() {
        Some(']') => {
            return Ok(AttrSelector {
                name,
                op: AttrOp::Exists,
                value: String::new(),
            });
        }
        Some('=') => AttrOp::Equals,
        Some(c @ ('~' | '^' | '$' | '*')) => {
            if chars.next() != Some('=') {
                return Err(format!("expected '=' after '{}'", c));
            }
            match c {
                '~' => AttrOp::Includes,
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                _ => AttrOp::Substring,
            }
        }
        Some(c) => return Err(format!("unsupported attribute operator '{}'", c)),
        None => return Err("unterminated attribute selector".to_string()),
    };

    skip_whitespace(chars);
    let value = match chars.peek() {
        Some(&q @ ('"' | '\'')) => {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == q => break,
                    Some(c) => value.push(c),
                    None => return Err("unterminated string".to_string()),
                }
            }
            value
        }
        _ => read_ident(chars)?,
    };

    skip_whitespace(chars);
    if chars.next() != Some(']') {
        return Err("expected ']'".to_string());
    }

    Ok(AttrSelector { name, op, value })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn read_ident(chars: &mut Peekable<Chars<'_>>) -> Result<String, String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }

    if ident.is_empty() {
        return Err("expected an identifier".to_string());
    }
    Ok(ident)
}

/// Returns whether any whitespace was consumed
fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) -> bool {
    let mut skipped = false;
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
        skipped = true;
    }
    skipped
}
