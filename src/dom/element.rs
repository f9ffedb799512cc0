use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// A DOM element in a page snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name, lowercase (e.g., "div", "button", "input")
    #[serde(deserialize_with = "lowercase_tag")]
    pub tag_name: String,

    /// Element attributes (e.g., id, class, role, data-testid)
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Text directly owned by the element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Child elements, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Whether the element itself renders (ancestors are checked separately)
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

fn lowercase_tag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|tag| tag.to_ascii_lowercase())
}

/// Input types whose `value` is their label
const BUTTON_INPUT_TYPES: &[&str] = &["button", "submit", "reset", "image"];

impl ElementNode {
    /// Create a new, visible ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: HashMap::new(),
            text_content: None,
            children: Vec::new(),
            is_visible: true,
        }
    }

    /// Builder method: set a single attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Builder method: append a child
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: set visibility
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.is_visible = visible;
        self
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Check if element has a specific class
    pub fn has_class(&self, class_name: &str) -> bool {
        self.get_attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }

    /// Get element ID
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// `data-testid` value, if any
    pub fn test_id(&self) -> Option<&str> {
        self.get_attribute("data-testid")
    }

    /// Hidden by markup (the `hidden` attribute) or by the snapshot flag
    pub fn is_self_hidden(&self) -> bool {
        !self.is_visible || self.attributes.contains_key("hidden")
    }

    /// ARIA role: the explicit `role` attribute, else the implicit role of the tag
    pub fn role(&self) -> Option<String> {
        if let Some(role) = self.get_attribute("role") {
            return role.split_whitespace().next().map(str::to_ascii_lowercase);
        }

        let implicit = match self.tag_name.to_ascii_lowercase().as_str() {
            "button" => "button",
            "a" if self.attributes.contains_key("href") => "link",
            "textarea" => "textbox",
            "select" => "combobox",
            "dialog" => "dialog",
            "img" => "img",
            "nav" => "navigation",
            "ul" | "ol" => "list",
            "li" => "listitem",
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
            "input" => match self.input_type().as_str() {
                t if BUTTON_INPUT_TYPES.contains(&t) => "button",
                "checkbox" => "checkbox",
                "radio" => "radio",
                "text" | "email" | "password" | "search" | "tel" | "url" => "textbox",
                _ => return None,
            },
            _ => return None,
        };

        Some(implicit.to_string())
    }

    /// Lowercased `type` attribute, `text` when absent
    fn input_type(&self) -> String {
        self.get_attribute("type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    /// Accessible name, computed from labelling attributes or descendant text
    pub fn accessible_name(&self) -> String {
        for attr in ["aria-label", "alt", "title", "placeholder"] {
            if let Some(value) = self.get_attribute(attr) {
                if !value.trim().is_empty() {
                    return value.trim().to_string();
                }
            }
        }

        if self.is_tag("input") && BUTTON_INPUT_TYPES.contains(&self.input_type().as_str()) {
            if let Some(value) = self.get_attribute("value").filter(|v| !v.trim().is_empty()) {
                return value.trim().to_string();
            }
        }

        let mut text = String::new();
        self.collect_text(&mut text);
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text_content {
            out.push(' ');
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Short tag-like description used in logs
    pub fn to_simple_string(&self) -> String {
        let mut parts = vec![format!("<{}", self.tag_name)];

        if let Some(id) = self.id() {
            parts.push(format!(" id=\"{}\"", id));
        }

        if let Some(test_id) = self.test_id() {
            parts.push(format!(" data-testid=\"{}\"", test_id));
        }

        if let Some(class) = self.get_attribute("class") {
            parts.push(format!(" class=\"{}\"", class));
        }

        parts.push(">".to_string());

        if let Some(text) = &self.text_content {
            if !text.trim().is_empty() {
                parts.push(text.trim().to_string());
            }
        }

        parts.join("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_creation() {
        let element = ElementNode::new("BUTTON")
            .with_attr("id", "submit")
            .with_attr("class", "btn primary")
            .with_text("Send");

        assert_eq!(element.tag_name, "button");
        assert_eq!(element.id(), Some("submit"));
        assert!(element.has_class("primary"));
        assert!(!element.has_class("secondary"));
        assert!(element.is_visible);
    }

    #[test]
    fn test_implicit_roles() {
        assert_eq!(ElementNode::new("button").role().as_deref(), Some("button"));
        assert_eq!(ElementNode::new("a").with_attr("href", "/").role().as_deref(), Some("link"));
        assert_eq!(ElementNode::new("a").role(), None);
        assert_eq!(ElementNode::new("input").role().as_deref(), Some("textbox"));
        assert_eq!(
            ElementNode::new("input").with_attr("type", "submit").role().as_deref(),
            Some("button")
        );
        assert_eq!(ElementNode::new("input").with_attr("type", "hidden").role(), None);
        assert_eq!(ElementNode::new("h2").role().as_deref(), Some("heading"));
        assert_eq!(ElementNode::new("div").role(), None);
    }

    #[test]
    fn test_explicit_role_wins() {
        let div = ElementNode::new("div").with_attr("role", "Button");
        assert_eq!(div.role().as_deref(), Some("button"));

        let link = ElementNode::new("a").with_attr("href", "#").with_attr("role", "tab");
        assert_eq!(link.role().as_deref(), Some("tab"));
    }

    #[test]
    fn test_accessible_name() {
        let labelled = ElementNode::new("button").with_attr("aria-label", "Close").with_text("×");
        assert_eq!(labelled.accessible_name(), "Close");

        let nested = ElementNode::new("button")
            .with_child(ElementNode::new("span").with_text("  Add to "))
            .with_child(ElementNode::new("strong").with_text("cart "));
        assert_eq!(nested.accessible_name(), "Add to cart");

        let input = ElementNode::new("input").with_attr("type", "submit").with_attr("value", "Go");
        assert_eq!(input.accessible_name(), "Go");

        let search = ElementNode::new("input").with_attr("placeholder", "Search products");
        assert_eq!(search.accessible_name(), "Search products");
    }

    #[test]
    fn test_hidden_attribute() {
        assert!(ElementNode::new("div").with_attr("hidden", "").is_self_hidden());
        assert!(ElementNode::new("div").with_visibility(false).is_self_hidden());
        assert!(!ElementNode::new("div").is_self_hidden());
    }

    #[test]
    fn test_text_input_value_is_not_its_name() {
        let field = ElementNode::new("input").with_attr("type", "text").with_attr("value", "shoes");
        assert_eq!(field.accessible_name(), "");

        let labelled = ElementNode::new("input")
            .with_attr("value", "shoes")
            .with_attr("placeholder", "Search");
        assert_eq!(labelled.accessible_name(), "Search");

        let empty_button = ElementNode::new("input")
            .with_attr("type", "button")
            .with_attr("value", "")
            .with_text("Go");
        assert_eq!(empty_button.accessible_name(), "Go");
    }

    #[test]
    fn test_deserialize_lowercases_tag() {
        let node: ElementNode = serde_json::from_str(r#"{"tag_name": "BUTTON", "text_content": "Buy"}"#).unwrap();
        assert_eq!(node.tag_name, "button");
        assert_eq!(node.role().as_deref(), Some("button"));

        let mut raw = ElementNode::new("a").with_attr("href", "/");
        raw.tag_name = "A".to_string();
        assert_eq!(raw.role().as_deref(), Some("link"));
    }

    #[test]
    fn test_deserialize_defaults_to_visible() {
        let node: ElementNode = serde_json::from_str(r#"{"tag_name": "div"}"#).unwrap();
        assert!(node.is_visible);
        assert!(node.attributes.is_empty());
    }

    #[test]
    fn test_to_simple_string() {
        let element = ElementNode::new("button")
            .with_attr("id", "my-btn")
            .with_attr("data-testid", "submit")
            .with_text("Submit");

        let simple = element.to_simple_string();
        assert!(simple.contains("<button"));
        assert!(simple.contains("id=\"my-btn\""));
        assert!(simple.contains("data-testid=\"submit\""));
        assert!(simple.contains("Submit"));
    }
}
