//! Export formats for captured elements
//!
//! Two documents are produced: a detailed report with every selector and its
//! uniqueness counts, and a flat name → locator map for automation scripts.

use crate::error::{HunterError, Result};
use crate::hunter::{AutomationLocator, CapturedElement, SelectorCounts};
use crate::hunter::selector::is_xpath_selector;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const TOOL_NAME: &str = concat!("Element Hunter v", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedExport {
    pub metadata: ExportMetadata,
    pub elements: Vec<DetailedElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub generated_at: String,
    pub url: String,
    pub total_elements: usize,
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedElement {
    pub name: String,
    pub tag_name: String,
    pub text: String,
    pub timestamp: String,
    pub selectors: ExportSelectors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSelectors {
    /// `#id`, when the element has an id attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `.first-class`, when the element has a class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Primary selector, unless it is an XPath
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_selector: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub xpath: String,
    pub counts: SelectorCounts,
}

impl From<&CapturedElement> for DetailedElement {
    fn from(element: &CapturedElement) -> Self {
        let attrs = &element.attributes;
        DetailedElement {
            name: element.name.clone(),
            tag_name: element.tag_name.clone(),
            text: element.text.clone(),
            timestamp: element.timestamp.clone(),
            selectors: ExportSelectors {
                id: attrs.id().map(|id| format!("#{}", id)),
                class_name: attrs.first_class().map(|c| format!(".{}", c)),
                css_selector: (!is_xpath_selector(&element.selector)).then(|| element.selector.clone()),
                xpath: element.xpath.clone(),
                counts: element.counts,
            },
        }
    }
}

/// Detailed report; fails on an empty session
pub fn detailed_export(
    elements: &[CapturedElement],
    url: &str,
    generated_at: DateTime<Utc>,
) -> Result<DetailedExport> {
    if elements.is_empty() {
        return Err(HunterError::NothingToExport);
    }
    Ok(DetailedExport {
        metadata: ExportMetadata {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            url: url.to_string(),
            total_elements: elements.len(),
            tool: TOOL_NAME.to_string(),
        },
        elements: elements.iter().map(DetailedElement::from).collect(),
    })
}

/// Name → locator map in capture order
///
/// A name seen twice keeps its first position and takes the later locator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutomationMap(Vec<(String, AutomationLocator)>);

impl AutomationMap {
    pub fn insert(&mut self, name: &str, locator: AutomationLocator) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = locator,
            None => self.0.push((name.to_string(), locator)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AutomationLocator> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AutomationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, locator) in &self.0 {
            map.serialize_entry(name, locator)?;
        }
        map.end()
    }
}

/// Automation map; fails on an empty session
pub fn automation_map(elements: &[CapturedElement]) -> Result<AutomationMap> {
    if elements.is_empty() {
        return Err(HunterError::NothingToExport);
    }
    let mut map = AutomationMap::default();
    for element in elements {
        map.insert(&element.name, element.best_locator());
    }
    Ok(map)
}

pub fn detailed_file_name(date: NaiveDate) -> String {
    format!("elements_{}.json", date.format("%Y-%m-%d"))
}

pub fn automation_file_name(date: NaiveDate) -> String {
    format!("selenium_automation_{}.json", date.format("%Y-%m-%d"))
}

/// Two-space indented JSON, as written to export files
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(detailed_file_name(date), "elements_2024-03-09.json");
        assert_eq!(automation_file_name(date), "selenium_automation_2024-03-09.json");
    }

    #[test]
    fn test_empty_session_cannot_export() {
        assert!(matches!(automation_map(&[]), Err(HunterError::NothingToExport)));
        assert!(matches!(
            detailed_export(&[], "https://x", Utc::now()),
            Err(HunterError::NothingToExport)
        ));
    }

    #[test]
    fn test_tool_name_carries_version() {
        assert!(TOOL_NAME.starts_with("Element Hunter v"));
    }
}
