use crate::dom::element::ElementNode;
use crate::dom::selector::SelectorList;
use crate::dom::{DomQuery, Query};
use crate::error::QueryError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// `command` values that close the element named by `commandfor`
const CLOSE_COMMANDS: &[&str] = &["close", "hide-popover", "request-close"];

/// Position of a node in a [`DomTree`]: child indices from the root.
///
/// Ordering of refs is document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(Vec<usize>);

impl NodeRef {
    pub fn root() -> Self {
        NodeRef(Vec::new())
    }

    pub fn path(&self) -> &[usize] {
        &self.0
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        NodeRef(path)
    }
}

/// Interaction state layered over the immutable snapshot
#[derive(Debug, Default)]
struct PageState {
    dismissed: HashSet<NodeRef>,
    clicks: Vec<NodeRef>,
    values: HashMap<NodeRef, String>,
}

/// In-memory DOM snapshot that answers [`DomQuery`] lookups.
///
/// Clicks and typed values are recorded. Clicking a dismiss control
/// (`data-bs-dismiss`/`data-dismiss` naming an ancestor class, or
/// `commandfor` + a closing `command`) hides its target.
#[derive(Debug)]
pub struct DomTree {
    /// Root element of the DOM tree
    pub root: ElementNode,

    state: Mutex<PageState>,
}

impl DomTree {
    pub fn new(root: ElementNode) -> Self {
        Self {
            root,
            state: Mutex::new(PageState::default()),
        }
    }

    /// Load a snapshot serialized as an [`ElementNode`] tree
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.root)
    }

    pub fn node(&self, handle: &NodeRef) -> Option<&ElementNode> {
        let mut node = &self.root;
        for &i in handle.path() {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    /// First element (document order) with the given `id`
    pub fn find_by_id(&self, id: &str) -> Option<NodeRef> {
        let mut found = None;
        walk(&self.root, &mut Vec::new(), &mut Vec::new(), &mut |path, node, _| {
            if found.is_none() && node.id() == Some(id) {
                found = Some(NodeRef(path.to_vec()));
            }
        });
        found
    }

    /// Every click so far, oldest first
    pub fn clicks(&self) -> Vec<NodeRef> {
        self.state().map(|state| state.clicks.clone()).unwrap_or_default()
    }

    /// Value typed into the element through [`DomQuery::fill`]
    pub fn value_of(&self, handle: &NodeRef) -> Option<String> {
        self.state().ok()?.values.get(handle).cloned()
    }

    fn state(&self) -> Result<MutexGuard<'_, PageState>, QueryError> {
        self.state
            .lock()
            .map_err(|_| QueryError::Backend("page state lock poisoned".to_string()))
    }

    fn existing(&self, handle: &NodeRef) -> Result<&ElementNode, QueryError> {
        self.node(handle)
            .ok_or_else(|| QueryError::StaleHandle(format!("no node at {:?}", handle.path())))
    }

    fn ensure_interactable(&self, handle: &NodeRef, action: &str) -> Result<&ElementNode, QueryError> {
        let node = self.existing(handle)?;
        if !self.is_visible(handle)? {
            return Err(QueryError::Backend(format!(
                "cannot {} hidden element {}",
                action,
                node.to_simple_string()
            )));
        }
        Ok(node)
    }

    /// Target hidden by clicking `node`, if it is a dismiss control
    fn dismiss_target(&self, handle: &NodeRef, node: &ElementNode) -> Option<NodeRef> {
        let dismiss_class = node
            .get_attribute("data-bs-dismiss")
            .or_else(|| node.get_attribute("data-dismiss"));

        if let Some(class) = dismiss_class {
            let path = handle.path();
            return (0..path.len())
                .rev()
                .map(|len| NodeRef(path[..len].to_vec()))
                .find(|ancestor| self.node(ancestor).is_some_and(|n| n.has_class(class)));
        }

        let command = node.get_attribute("command")?;
        if CLOSE_COMMANDS.contains(&command.to_ascii_lowercase().as_str()) {
            return self.find_by_id(node.get_attribute("commandfor")?);
        }
        None
    }
}

impl DomQuery for DomTree {
    type Handle = NodeRef;

    fn find(&self, scope: Option<&NodeRef>, query: &Query<'_>) -> Result<Vec<NodeRef>, QueryError> {
        let scope_path = match scope {
            Some(scope) => {
                self.existing(scope)?;
                scope.path()
            }
            None => &[],
        };

        let selector = match query {
            Query::Css(selector) => Some(SelectorList::parse(selector)?),
            _ => None,
        };

        let mut matches = Vec::new();
        walk(&self.root, &mut Vec::new(), &mut Vec::new(), &mut |path, node, ancestors| {
            let in_scope = path.starts_with(scope_path) && (scope.is_none() || path.len() > scope_path.len());
            if !in_scope {
                return;
            }

            let hit = match query {
                Query::TestId(id) => node.test_id() == Some(*id),
                Query::Role { role, name } => {
                    node.role().is_some_and(|r| r.eq_ignore_ascii_case(role)) && name.matches(&node.accessible_name())
                }
                Query::Css(_) => selector.as_ref().is_some_and(|s| s.matches(node, ancestors)),
            };
            if hit {
                matches.push(NodeRef(path.to_vec()));
            }
        });

        Ok(matches)
    }

    fn is_visible(&self, handle: &NodeRef) -> Result<bool, QueryError> {
        self.existing(handle)?;
        let state = self.state()?;

        let path = handle.path();
        let mut node = &self.root;
        for depth in 0..=path.len() {
            if depth > 0 {
                node = &node.children[path[depth - 1]];
            }
            if node.is_self_hidden() || state.dismissed.contains(&NodeRef(path[..depth].to_vec())) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn click(&self, handle: &NodeRef) -> Result<(), QueryError> {
        let node = self.ensure_interactable(handle, "click")?;
        let target = self.dismiss_target(handle, node);

        let mut state = self.state()?;
        state.clicks.push(handle.clone());
        if let Some(target) = target {
            log::debug!("Click on {} hides {:?}", node.to_simple_string(), target.path());
            state.dismissed.insert(target);
        }
        Ok(())
    }

    fn fill(&self, handle: &NodeRef, text: &str) -> Result<(), QueryError> {
        self.ensure_interactable(handle, "fill")?;
        self.state()?.values.insert(handle.clone(), text.to_string());
        Ok(())
    }
}

/// Pre-order traversal handing each node its path and ancestor chain
fn walk<'a>(
    node: &'a ElementNode,
    path: &mut Vec<usize>,
    ancestors: &mut Vec<&'a ElementNode>,
    visit: &mut dyn FnMut(&[usize], &'a ElementNode, &[&'a ElementNode]),
) {
    visit(path, node, ancestors);

    ancestors.push(node);
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        walk(child, path, ancestors, visit);
        path.pop();
    }
    ancestors.pop();
}
