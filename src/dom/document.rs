//! Arena-backed DOM model
//!
//! The capture engine treats the page as a read-only oracle that it queries at
//! capture time. `Document` is that oracle: a plain tree of element and text
//! nodes with attributes, form values and layout bounds, built either by hand
//! (tests, fixtures) or from a live page snapshot (see [`super::snapshot`]).

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Maximum length of captured visible text, ellipsis included
pub const MAX_TEXT_LEN: usize = 50;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Arena index of this node
    pub fn index(self) -> usize {
        self.0
    }
}

/// Viewport rectangle of an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the viewport point falls inside this rectangle
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && x >= self.x
            && x < self.x + self.width
            && y >= self.y
            && y < self.y + self.height
    }
}

/// Attribute list in source order
///
/// Serializes as a JSON object whose key order follows the element's own
/// attribute order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets an attribute, replacing an existing value in place
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.0.push((name, value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.get("id").filter(|v| !v.is_empty())
    }

    /// Non-empty `name` attribute
    pub fn name(&self) -> Option<&str> {
        self.get("name").filter(|v| !v.is_empty())
    }

    /// Whitespace-separated class tokens
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get("class").unwrap_or("").split_whitespace()
    }

    pub fn first_class(&self) -> Option<&str> {
        self.classes().next()
    }

    /// First `data-*` attribute in source order
    pub fn first_data_attribute(&self) -> Option<(&str, &str)> {
        self.iter().find(|(n, _)| n.starts_with("data-"))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name.as_ref(), value.as_ref());
        }
        attrs
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Attributes, A::Error> {
                let mut attrs = Attributes::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    attrs.set(&name, &value);
                }
                Ok(attrs)
            }
        }

        deserializer.deserialize_map(AttributesVisitor)
    }
}

/// Element payload of a DOM node
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Lower-cased tag name
    pub tag: String,
    pub attributes: Attributes,
    /// Current form value (`input`, `textarea`, `select`)
    pub value: Option<String>,
    /// Viewport bounds, when layout information is known
    pub rect: Option<Rect>,
    /// Whether a click handler is registered on the element
    pub click_handler: bool,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Attributes::new(),
            value: None,
            rect: None,
            click_handler: false,
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn with_id(self, id: &str) -> Self {
        self.with_attr("id", id)
    }

    pub fn with_class(self, class: &str) -> Self {
        self.with_attr("class", class)
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn with_click_handler(mut self) -> Self {
        self.click_handler = true;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.id()
    }

    pub fn name_attr(&self) -> Option<&str> {
        self.attributes.name()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes.classes()
    }

    pub fn first_class(&self) -> Option<&str> {
        self.attributes.first_class()
    }

    /// Case-insensitive substring match against every class token
    pub fn has_class_containing(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.classes().any(|c| c.to_lowercase().contains(&needle))
    }

    pub fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }

    /// `type` attribute, lower-cased
    pub fn input_type(&self) -> Option<String> {
        self.attributes.get("type").map(|t| t.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// A DOM tree rooted at a document node
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document containing only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// Document with an `html > head + body` skeleton
    pub fn with_body() -> Self {
        let mut doc = Self::new();
        let html = doc.append_element(doc.root(), ElementData::new("html"));
        doc.append_element(html, ElementData::new("head"));
        doc.append_element(html, ElementData::new("body"));
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn append_element(&mut self, parent: NodeId, element: ElementData) -> NodeId {
        self.append(parent, NodeData::Element(element))
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeData::Text(text.to_string()))
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Parent node if it is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    /// Element ancestors, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent_element(id), move |n| self.parent_element(*n))
    }

    /// Whether `id` is `ancestor` or lies beneath it
    pub fn is_inclusive_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        std::iter::successors(Some(id), |n| self.parent(*n)).any(|n| n == ancestor)
    }

    pub fn depth(&self, id: NodeId) -> usize {
        std::iter::successors(self.parent(id), |n| self.parent(*n)).count()
    }

    /// Descendants of `id` in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Every element in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|n| self.is_element(*n))
            .collect()
    }

    /// Preorder position of every node, indexed by arena index
    pub fn preorder_index(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        order[0] = 0;
        for (pos, node) in self.descendants(self.root()).into_iter().enumerate() {
            order[node.0] = pos + 1;
        }
        order
    }

    /// The `html` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).next()
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|c| self.tag(*c) == Some("body"))
    }

    /// First element carrying the given id, like `getElementById`
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|n| self.element(*n).and_then(|el| el.id()) == Some(id))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => text.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| match &self.nodes[n.0].data {
                    NodeData::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Visible text or form value, truncated to [`MAX_TEXT_LEN`] characters
    pub fn visible_text(&self, id: NodeId) -> String {
        let text = match self.element(id) {
            Some(el) if el.is_form_control() => el.value.clone().unwrap_or_default(),
            _ => self.text_content(id).trim().to_string(),
        };
        truncate_with_ellipsis(&text, MAX_TEXT_LEN)
    }

    /// Elements whose bounds contain the point, topmost first
    ///
    /// Without a paint order, deeper elements are considered on top of their
    /// ancestors and later siblings on top of earlier ones.
    pub fn elements_from_point(&self, x: f64, y: f64) -> Vec<NodeId> {
        let order = self.preorder_index();
        let mut hits: Vec<NodeId> = self
            .elements()
            .into_iter()
            .filter(|n| {
                self.element(*n)
                    .and_then(|el| el.rect)
                    .map(|r| r.contains(x, y))
                    .unwrap_or(false)
            })
            .collect();
        hits.sort_by(|a, b| {
            self.depth(*b)
                .cmp(&self.depth(*a))
                .then(order[b.0].cmp(&order[a.0]))
        });
        hits
    }
}

/// Cuts `text` to `max` characters, the last three replaced by `...`
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let list = doc.append_element(body, ElementData::new("ul").with_class("menu"));
        let first = doc.append_element(list, ElementData::new("LI"));
        doc.append_text(first, "  Home ");
        let second = doc.append_element(list, ElementData::new("li"));
        doc.append_text(second, "About");
        (doc, first, second)
    }

    #[test]
    fn test_tags_are_lower_cased() {
        let (doc, first, _) = sample();
        assert_eq!(doc.tag(first), Some("li"));
    }

    #[test]
    fn test_visible_text_trims_and_truncates() {
        let (mut doc, first, _) = sample();
        assert_eq!(doc.visible_text(first), "Home");

        let body = doc.body().unwrap();
        let p = doc.append_element(body, ElementData::new("p"));
        doc.append_text(p, &"x".repeat(80));
        let text = doc.visible_text(p);
        assert_eq!(text.chars().count(), MAX_TEXT_LEN);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_form_value_wins_over_text() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let input = doc.append_element(body, ElementData::new("input").with_value("ankara"));
        assert_eq!(doc.visible_text(input), "ankara");

        let empty = doc.append_element(body, ElementData::new("textarea"));
        assert_eq!(doc.visible_text(empty), "");
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (doc, first, _) = sample();
        let chain: Vec<&str> = doc
            .ancestors(first)
            .map(|n| doc.tag(n).unwrap())
            .collect();
        assert_eq!(chain, vec!["ul", "body", "html"]);
    }

    #[test]
    fn test_attributes_keep_source_order_in_json() {
        let el = ElementData::new("a")
            .with_attr("href", "/x")
            .with_attr("class", "nav-link")
            .with_attr("data-id", "7");
        let json = serde_json::to_string(&el.attributes).unwrap();
        assert_eq!(json, r#"{"href":"/x","class":"nav-link","data-id":"7"}"#);

        let back: Attributes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, el.attributes);
        assert_eq!(back.first_data_attribute(), Some(("data-id", "7")));
    }

    #[test]
    fn test_elements_from_point_orders_topmost_first() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let card = doc.append_element(
            body,
            ElementData::new("div").with_rect(Rect::new(0.0, 0.0, 200.0, 200.0)),
        );
        let img = doc.append_element(
            card,
            ElementData::new("img").with_rect(Rect::new(10.0, 10.0, 50.0, 50.0)),
        );
        let badge = doc.append_element(
            card,
            ElementData::new("span").with_rect(Rect::new(10.0, 10.0, 20.0, 20.0)),
        );

        assert_eq!(doc.elements_from_point(15.0, 15.0), vec![badge, img, card]);
        assert_eq!(doc.elements_from_point(100.0, 100.0), vec![card]);
        assert!(doc.elements_from_point(500.0, 500.0).is_empty());
    }

    #[test]
    fn test_truncate_with_ellipsis_counts_chars() {
        assert_eq!(truncate_with_ellipsis("kısa", 50), "kısa");
        let long = "ğ".repeat(70);
        let cut = truncate_with_ellipsis(&long, 60);
        assert_eq!(cut.chars().count(), 60);
    }
}
