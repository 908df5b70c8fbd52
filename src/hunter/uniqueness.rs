//! Uniqueness evaluation and best-locator choice
//!
//! Every candidate locator of a captured element is run against the live
//! document. A locator that fails to parse counts as zero matches; it never
//! aborts a capture.

use super::selector::{is_xpath_selector, SynthesizedSelector};
use crate::dom::{css, xpath, Attributes, Document, NodeId};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Match counts for each candidate locator kind
///
/// All four keys are always present; a kind that does not apply counts 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorCounts {
    pub id: usize,
    pub class_name: usize,
    pub css_selector: usize,
    pub xpath: usize,
}

impl SelectorCounts {
    pub fn is_empty(&self) -> bool {
        self.id == 0 && self.class_name == 0 && self.css_selector == 0 && self.xpath == 0
    }
}

/// Locator strings whose matches make up [`SelectorCounts`]
///
/// A `None` entry does not apply to the element and counts 0. The same query
/// is answered by a [`Document`] or, in the browser, by `querySelectorAll` and
/// `document.evaluate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatorQuery {
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub css_selector: Option<String>,
    pub xpath: Option<String>,
}

impl LocatorQuery {
    pub fn new(attributes: &Attributes, selector: &str, xpath: &str) -> Self {
        Self {
            id: attributes.id().map(|id| format!("#{}", id)),
            class_name: attributes.first_class().map(|class| format!(".{}", class)),
            css_selector: (!is_xpath_selector(selector)).then(|| selector.to_string()),
            xpath: (!xpath.is_empty()).then(|| xpath.to_string()),
        }
    }

    /// Counts against an in-memory document
    pub fn count_in(&self, doc: &Document) -> SelectorCounts {
        let css_count = |selector: &Option<String>| {
            selector
                .as_deref()
                .map_or(0, |s| count_or_zero(css::count(doc, s)))
        };
        SelectorCounts {
            id: css_count(&self.id),
            class_name: css_count(&self.class_name),
            css_selector: css_count(&self.css_selector),
            xpath: self
                .xpath
                .as_deref()
                .map_or(0, |x| count_or_zero(xpath::count(doc, x))),
        }
    }
}

pub fn evaluate_counts(doc: &Document, node: NodeId, synthesized: &SynthesizedSelector) -> SelectorCounts {
    match doc.element(node) {
        Some(el) => LocatorQuery::new(&el.attributes, &synthesized.selector, &synthesized.xpath).count_in(doc),
        None => SelectorCounts::default(),
    }
}

fn count_or_zero(result: Result<usize>) -> usize {
    match result {
        Ok(n) => n,
        Err(e) => {
            log::debug!("🔍 Locator not evaluable, counting 0: {}", e);
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocatorKind {
    Id,
    ClassName,
    CssSelector,
    Xpath,
}

/// Locator handed to a test-automation tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationLocator {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: LocatorKind,
}

/// Most stable locator for an element, given its uniqueness counts
///
/// Order: unique id, unique first class, unique non-XPath primary selector,
/// then the positional XPath.
pub fn best_locator(
    attributes: &Attributes,
    selector: &str,
    xpath: &str,
    counts: &SelectorCounts,
) -> AutomationLocator {
    if let Some(id) = attributes.id() {
        if counts.id == 1 {
            return AutomationLocator {
                value: id.to_string(),
                kind: LocatorKind::Id,
            };
        }
    }
    if let Some(class) = attributes.first_class() {
        if counts.class_name == 1 {
            return AutomationLocator {
                value: class.to_string(),
                kind: LocatorKind::ClassName,
            };
        }
    }
    if !is_xpath_selector(selector) && counts.css_selector == 1 {
        return AutomationLocator {
            value: selector.to_string(),
            kind: LocatorKind::CssSelector,
        };
    }
    AutomationLocator {
        value: xpath.to_string(),
        kind: LocatorKind::Xpath,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementData;
    use crate::hunter::selector::{synthesize, SelectorConfig};

    #[test]
    fn test_counts_for_unique_button() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let button = doc.append_element(
            body,
            ElementData::new("button").with_id("submit-btn").with_class("btn primary"),
        );
        doc.append_element(body, ElementData::new("a").with_class("btn"));

        let s = synthesize(&doc, button, &SelectorConfig::default());
        let counts = evaluate_counts(&doc, button, &s);
        assert_eq!(
            counts,
            SelectorCounts {
                id: 1,
                class_name: 2,
                css_selector: 1,
                xpath: 1
            }
        );
    }

    #[test]
    fn test_invalid_id_counts_zero() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let div = doc.append_element(body, ElementData::new("div").with_id("1abc"));

        let s = synthesize(&doc, div, &SelectorConfig::default());
        let counts = evaluate_counts(&doc, div, &s);
        assert_eq!(counts.id, 0);
        assert_eq!(counts.css_selector, 0);
        assert_eq!(counts.xpath, 1);
    }

    #[test]
    fn test_xpath_primary_has_no_css_count() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let span = doc.append_element(body, ElementData::new("span"));

        let s = synthesize(&doc, span, &SelectorConfig::default());
        let counts = evaluate_counts(&doc, span, &s);
        assert_eq!(counts.css_selector, 0);
        assert_eq!(counts.xpath, 1);
        assert_eq!(
            serde_json::to_value(counts).unwrap(),
            serde_json::json!({"id": 0, "className": 0, "cssSelector": 0, "xpath": 1})
        );
    }

    #[test]
    fn test_locator_query_skips_what_does_not_apply() {
        let attrs: Attributes = [("class", "thumb lazy")].into_iter().collect();
        let query = LocatorQuery::new(&attrs, "/descendant::img[1]", "/html/body/img");
        assert_eq!(query.id, None);
        assert_eq!(query.class_name.as_deref(), Some(".thumb"));
        assert_eq!(query.css_selector, None);
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({"id": null, "className": ".thumb", "cssSelector": null, "xpath": "/html/body/img"})
        );
    }

    #[test]
    fn test_best_locator_ladder() {
        let attrs: Attributes = [("id", "submit-btn"), ("class", "btn primary")].into_iter().collect();
        let unique = SelectorCounts { id: 1, class_name: 3, css_selector: 1, xpath: 1 };
        assert_eq!(
            best_locator(&attrs, "#submit-btn", "//*[@id=\"submit-btn\"]", &unique),
            AutomationLocator { value: "submit-btn".into(), kind: LocatorKind::Id }
        );

        let shared_id = SelectorCounts { id: 2, class_name: 1, css_selector: 2, xpath: 2 };
        assert_eq!(
            best_locator(&attrs, "#submit-btn", "//*[@id=\"submit-btn\"]", &shared_id).kind,
            LocatorKind::ClassName
        );

        let data: Attributes = [("data-testid", "price")].into_iter().collect();
        let counts = SelectorCounts { css_selector: 1, xpath: 1, ..Default::default() };
        assert_eq!(
            best_locator(&data, "[data-testid=\"price\"]", "/html/body/span", &counts).kind,
            LocatorKind::CssSelector
        );

        let image = SelectorCounts { xpath: 1, ..Default::default() };
        let loc = best_locator(&Attributes::new(), "/descendant::img[1]", "/html/body/img", &image);
        assert_eq!(loc.kind, LocatorKind::Xpath);
        assert_eq!(loc.value, "/html/body/img");
    }
}
