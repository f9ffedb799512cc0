use crate::dom::{DomQuery, DomTree, Query};
use crate::error::QueryError;
use headless_chrome::{Element, Tab};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tags elements matching a lookup and returns their accessible names
const PROBE_JS: &str = include_str!("probe.js");

/// Serializes `document.body` into an `ElementNode` tree
const SNAPSHOT_JS: &str = include_str!("snapshot.js");

const VISIBLE_JS: &str = r#"
    function () {
        if (!this.isConnected) return false;
        const style = window.getComputedStyle(this);
        const rect = this.getBoundingClientRect();
        return style.display !== 'none'
            && style.visibility !== 'hidden'
            && rect.width > 0
            && rect.height > 0;
    }
"#;

const CLEAR_JS: &str = r#"
    function () {
        if ('value' in this) {
            this.value = '';
            this.dispatchEvent(new Event('input', { bubbles: true }));
        }
        return true;
    }
"#;

/// Handle to an element of a [`ChromePage`].
///
/// Only the CDP node ids are kept; the element is looked up again on every
/// call, so a handle from before a navigation reports as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromeElement {
    pub node_id: u32,
    pub backend_node_id: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeResult {
    #[serde(default)]
    names: Vec<String>,
    error: Option<String>,
}

/// [`DomQuery`] over a live headless Chrome tab
pub struct ChromePage {
    tab: Arc<Tab>,
    probe_seq: AtomicU64,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self {
            tab,
            probe_seq: AtomicU64::new(0),
        }
    }

    /// Get the underlying tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Capture the current page as an offline [`DomTree`]
    pub fn snapshot(&self) -> Result<DomTree, QueryError> {
        let result = self
            .tab
            .evaluate(SNAPSHOT_JS, false)
            .map_err(|e| QueryError::Backend(format!("Failed to execute snapshot script: {}", e)))?;

        let json = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| QueryError::Backend("No value returned from snapshot script".to_string()))?;

        DomTree::from_json(json).map_err(|e| QueryError::Backend(format!("Failed to parse snapshot: {}", e)))
    }

    fn element(&self, handle: &ChromeElement) -> Result<Element<'_>, QueryError> {
        Element::new(&self.tab, handle.node_id)
            .map_err(|e| QueryError::StaleHandle(format!("node {}: {}", handle.node_id, e)))
    }

    /// Run the probe script under `scope` and return the probe token plus
    /// the accessible name of every tagged element, in document order
    fn probe(&self, scope: Option<&ChromeElement>, kind: &str, arg: &str) -> Result<(String, Vec<String>), QueryError> {
        let root = match scope {
            Some(handle) => self.element(handle)?,
            None => self
                .tab
                .find_element("html")
                .map_err(|e| QueryError::Backend(format!("Document root unavailable: {}", e)))?,
        };

        let token = format!("p{}", self.probe_seq.fetch_add(1, Ordering::Relaxed));
        let result = root
            .call_js_fn(
                PROBE_JS,
                vec![
                    serde_json::json!(kind),
                    serde_json::json!(arg),
                    serde_json::json!(token),
                ],
                false,
            )
            .map_err(|e| QueryError::Backend(format!("Probe script failed: {}", e)))?;

        let raw = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| QueryError::Backend("No value returned from probe script".to_string()))?;

        let parsed: ProbeResult =
            serde_json::from_str(raw).map_err(|e| QueryError::Backend(format!("Malformed probe result: {}", e)))?;

        match parsed.error {
            Some(reason) if kind == "css" => Err(QueryError::InvalidSelector {
                selector: arg.to_string(),
                reason,
            }),
            Some(reason) => Err(QueryError::Backend(reason)),
            None => Ok((token, parsed.names)),
        }
    }

    fn tagged(&self, token: &str, index: usize) -> Result<ChromeElement, QueryError> {
        let selector = format!("[data-e2e-probe=\"{}-{}\"]", token, index);
        let element = self
            .tab
            .find_element(&selector)
            .map_err(|e| QueryError::StaleHandle(format!("{} vanished: {}", selector, e)))?;

        Ok(ChromeElement {
            node_id: element.node_id,
            backend_node_id: element.backend_node_id,
        })
    }
}

impl DomQuery for ChromePage {
    type Handle = ChromeElement;

    fn find(&self, scope: Option<&ChromeElement>, query: &Query<'_>) -> Result<Vec<ChromeElement>, QueryError> {
        let (token, names) = match query {
            Query::TestId(id) => self.probe(scope, "testid", id)?,
            Query::Role { role, .. } => self.probe(scope, "role", &role.to_ascii_lowercase())?,
            Query::Css(selector) => self.probe(scope, "css", selector)?,
        };

        let mut handles = Vec::new();
        for (index, name) in names.iter().enumerate() {
            if let Query::Role { name: pattern, .. } = query {
                if !pattern.matches(name) {
                    continue;
                }
            }
            handles.push(self.tagged(&token, index)?);
        }

        log::debug!("{} matched {} element(s)", query, handles.len());
        Ok(handles)
    }

    fn is_visible(&self, handle: &ChromeElement) -> Result<bool, QueryError> {
        let result = self
            .element(handle)?
            .call_js_fn(VISIBLE_JS, Vec::new(), false)
            .map_err(|e| QueryError::StaleHandle(format!("node {}: {}", handle.node_id, e)))?;

        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn click(&self, handle: &ChromeElement) -> Result<(), QueryError> {
        self.element(handle)?
            .click()
            .map_err(|e| QueryError::Backend(format!("Click failed: {}", e)))?;
        Ok(())
    }

    fn fill(&self, handle: &ChromeElement, text: &str) -> Result<(), QueryError> {
        let element = self.element(handle)?;
        element
            .call_js_fn(CLEAR_JS, Vec::new(), false)
            .map_err(|e| QueryError::Backend(format!("Failed to clear input: {}", e)))?;
        element
            .type_into(text)
            .map_err(|e| QueryError::Backend(format!("Typing failed: {}", e)))?;
        Ok(())
    }
}
