//! Click target resolution
//!
//! The element a user means to capture is often not the event target: a
//! transparent link overlay or a wrapper can sit on top of the image or button
//! they clicked. The resolver walks the stack under the pointer instead.

use crate::dom::{Document, ElementData, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Id of the status overlay injected into the page
    pub overlay_id: String,
    /// Class substrings that mark an element as worth capturing
    pub important_classes: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            overlay_id: "element-hunter-overlay".to_string(),
            important_classes: vec![
                "productCard__img".to_string(),
                "productCard__title".to_string(),
                "product-title".to_string(),
                "product-name".to_string(),
                "product-price".to_string(),
                "product-image".to_string(),
                "add-to-cart".to_string(),
            ],
        }
    }
}

const CLICKABLE_TAGS: [&str; 5] = ["a", "button", "input", "select", "textarea"];

pub fn is_clickable(el: &ElementData) -> bool {
    CLICKABLE_TAGS.contains(&el.tag.as_str())
        || el.click_handler
        || el.attributes.contains("onclick")
        || el.attributes.get("role") == Some("button")
}

pub fn is_important(el: &ElementData, config: &ResolverConfig) -> bool {
    config
        .important_classes
        .iter()
        .any(|class| el.has_class_containing(class))
}

/// Whether `node` is the overlay or inside it
pub fn is_overlay(doc: &Document, node: NodeId, config: &ResolverConfig) -> bool {
    doc.element_by_id(&config.overlay_id)
        .map(|overlay| doc.is_inclusive_descendant(node, overlay))
        .unwrap_or(false)
}

/// Drop the overlay subtree, the `html` element and `body` from a pointer stack
pub fn filter_stack(doc: &Document, stack: &[NodeId], config: &ResolverConfig) -> Vec<NodeId> {
    let overlay = doc.element_by_id(&config.overlay_id);
    let html = doc.document_element();
    let body = doc.body();

    stack
        .iter()
        .copied()
        .filter(|n| doc.is_element(*n))
        .filter(|n| Some(*n) != html && Some(*n) != body)
        .filter(|n| overlay.map(|o| !doc.is_inclusive_descendant(*n, o)).unwrap_or(true))
        .collect()
}

/// Pick the element to capture from the stack under the pointer (topmost first)
///
/// The first image, clickable or important-class element wins; otherwise the
/// topmost remaining element, and the event target when nothing remains.
pub fn resolve_target(
    doc: &Document,
    stack: &[NodeId],
    event_target: NodeId,
    config: &ResolverConfig,
) -> NodeId {
    let candidates = filter_stack(doc, stack, config);

    let preferred = candidates.iter().copied().find(|n| {
        doc.element(*n)
            .map(|el| el.tag == "img" || is_clickable(el) || is_important(el, config))
            .unwrap_or(false)
    });

    preferred
        .or_else(|| candidates.first().copied())
        .unwrap_or(event_target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    #[test]
    fn test_image_under_wrapper_wins() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let card = doc.append_element(body, ElementData::new("div").with_class("card"));
        let img = doc.append_element(card, ElementData::new("img").with_class("productCard__img"));
        let cover = doc.append_element(card, ElementData::new("div").with_class("cover"));

        let stack = vec![cover, img, card, body, doc.document_element().unwrap()];
        assert_eq!(resolve_target(&doc, &stack, cover, &ResolverConfig::default()), img);
    }

    #[test]
    fn test_overlay_and_page_roots_are_skipped() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let overlay = doc.append_element(body, ElementData::new("div").with_id("element-hunter-overlay"));
        let label = doc.append_element(overlay, ElementData::new("span"));
        let plain = doc.append_element(body, ElementData::new("section"));
        let config = ResolverConfig::default();

        let stack = vec![label, overlay, plain, body];
        assert_eq!(filter_stack(&doc, &stack, &config), vec![plain]);
        assert_eq!(resolve_target(&doc, &stack, label, &config), plain);
        assert!(is_overlay(&doc, label, &config));
        assert!(!is_overlay(&doc, plain, &config));
    }

    #[test]
    fn test_empty_stack_falls_back_to_event_target() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let div = doc.append_element(body, ElementData::new("div").with_rect(Rect::new(0.0, 0.0, 10.0, 10.0)));

        assert_eq!(resolve_target(&doc, &[], div, &ResolverConfig::default()), div);
        assert_eq!(resolve_target(&doc, &[body], div, &ResolverConfig::default()), div);
    }

    #[test]
    fn test_clickable_signals() {
        assert!(is_clickable(&ElementData::new("a")));
        assert!(is_clickable(&ElementData::new("div").with_attr("role", "button")));
        assert!(is_clickable(&ElementData::new("span").with_attr("onclick", "go()")));
        assert!(is_clickable(&ElementData::new("div").with_click_handler()));
        assert!(!is_clickable(&ElementData::new("div")));
    }
}
