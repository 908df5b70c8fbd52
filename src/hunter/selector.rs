//! Selector synthesis
//!
//! Picks one primary locator per element by a fixed priority ladder and always
//! computes a positional XPath alongside it.

use crate::dom::{Document, NodeId};
use serde::{Deserialize, Serialize};

/// Which rule produced the primary selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorType {
    Id,
    Name,
    ClassName,
    DataAttribute,
    Xpath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Class substrings that identify product-image `img` elements
    pub product_image_classes: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            product_image_classes: vec![
                "productCard__img".to_string(),
                "product-image".to_string(),
                "product-img".to_string(),
                "product__image".to_string(),
                "productImage".to_string(),
            ],
        }
    }
}

impl SelectorConfig {
    fn is_product_image_class(&self, class: &str) -> bool {
        let class = class.to_lowercase();
        self.product_image_classes
            .iter()
            .any(|token| class.contains(&token.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedSelector {
    pub selector: String,
    pub selector_type: SelectorType,
    /// Positional XPath, computed for every element
    pub xpath: String,
}

/// Whether a primary selector is an XPath rather than CSS
pub fn is_xpath_selector(selector: &str) -> bool {
    selector.starts_with('/')
}

/// Quote a string as an XPath literal
pub fn xpath_literal(value: &str) -> String {
    if value.contains('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

/// Build the primary selector and positional XPath for `node`
pub fn synthesize(doc: &Document, node: NodeId, config: &SelectorConfig) -> SynthesizedSelector {
    let xpath = xpath_fallback(doc, node);
    let (selector, selector_type) = primary_selector(doc, node, config)
        .unwrap_or_else(|| (xpath.clone(), SelectorType::Xpath));

    SynthesizedSelector {
        selector,
        selector_type,
        xpath,
    }
}

fn primary_selector(
    doc: &Document,
    node: NodeId,
    config: &SelectorConfig,
) -> Option<(String, SelectorType)> {
    let el = doc.element(node)?;

    if let Some(id) = el.id() {
        return Some((format!("#{}", id), SelectorType::Id));
    }
    if let Some(name) = el.name_attr() {
        return Some((format!("[name=\"{}\"]", name), SelectorType::Name));
    }

    if el.tag == "img" {
        if let Some(token) = el.classes().find(|c| config.is_product_image_class(c)) {
            let ordinal = doc
                .elements()
                .into_iter()
                .filter(|n| {
                    doc.element(*n)
                        .map(|e| e.tag == "img" && e.attributes.get("class").unwrap_or("").contains(token))
                        .unwrap_or(false)
                })
                .position(|n| n == node)
                .map(|p| p + 1)
                .unwrap_or(1);
            return Some((
                format!(
                    "/descendant::img[contains(@class, {})][{}]",
                    xpath_literal(token),
                    ordinal
                ),
                SelectorType::Xpath,
            ));
        }
        if let Some(class) = el.first_class() {
            return Some((format!("img.{}", class), SelectorType::ClassName));
        }
    }

    if let Some(class) = el.first_class() {
        return Some((format!(".{}", class), SelectorType::ClassName));
    }
    if let Some((name, value)) = el.attributes.first_data_attribute() {
        return Some((format!("[{}=\"{}\"]", name, value), SelectorType::DataAttribute));
    }
    None
}

/// Absolute XPath for `node`
///
/// Elements with an id short-circuit to `//*[@id="..."]`. Otherwise each step
/// from the root is the tag name, indexed only when a same-tag sibling exists.
pub fn xpath_fallback(doc: &Document, node: NodeId) -> String {
    let Some(el) = doc.element(node) else {
        return String::new();
    };
    if let Some(id) = el.id() {
        return format!("//*[@id={}]", xpath_literal(id));
    }

    let mut steps = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        let Some(tag) = doc.tag(n) else { break };
        let siblings: Vec<NodeId> = doc
            .parent(n)
            .map(|p| {
                doc.element_children(p)
                    .filter(|s| doc.tag(*s) == Some(tag))
                    .collect()
            })
            .unwrap_or_default();
        let position = siblings.iter().position(|s| *s == n).unwrap_or(0);
        if siblings.len() > 1 {
            steps.push(format!("{}[{}]", tag, position + 1));
        } else {
            steps.push(tag.to_string());
        }
        current = doc.parent_element(n);
    }

    if steps.is_empty() {
        return String::new();
    }
    steps.reverse();
    format!("/{}", steps.join("/"))
}
