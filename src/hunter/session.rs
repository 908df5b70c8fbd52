//! Captured elements and the session that holds them
//!
//! A session is append-only between clears. `(selector, text)` identifies an
//! element; capturing the same pair again leaves the session unchanged.

use super::selector::SelectorType;
use super::uniqueness::{best_locator, AutomationLocator, SelectorCounts};
use crate::dom::Attributes;
use serde::{Deserialize, Serialize};

/// Selectors longer than this are shortened for display
pub const SELECTOR_DISPLAY_LEN: usize = 60;

/// One element captured by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedElement {
    /// ISO-8601 capture time
    pub timestamp: String,
    pub tag_name: String,
    /// Visible text or form value, at most 50 characters
    pub text: String,
    pub attributes: Attributes,
    pub selector: String,
    pub selector_type: SelectorType,
    pub xpath: String,
    pub name: String,
    #[serde(default)]
    pub counts: SelectorCounts,
}

impl CapturedElement {
    pub fn best_locator(&self) -> AutomationLocator {
        best_locator(&self.attributes, &self.selector, &self.xpath, &self.counts)
    }

    /// Identity used for de-duplication
    pub fn same_target(&self, other: &CapturedElement) -> bool {
        self.selector == other.selector && self.text == other.text
    }
}

/// Ordered, de-duplicated list of captured elements plus the name counter
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    elements: Vec<CapturedElement>,
    counter: u32,
    capture_and_click: bool,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            counter: 1,
            capture_and_click: false,
        }
    }

    pub fn restore(elements: Vec<CapturedElement>, counter: u32, capture_and_click: bool) -> Self {
        Self {
            elements,
            counter: counter.max(1),
            capture_and_click,
        }
    }

    pub fn elements(&self) -> &[CapturedElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub(crate) fn counter_mut(&mut self) -> &mut u32 {
        &mut self.counter
    }

    pub fn capture_and_click(&self) -> bool {
        self.capture_and_click
    }

    pub fn set_capture_and_click(&mut self, enabled: bool) {
        self.capture_and_click = enabled;
    }

    /// Append unless an element with the same selector and text exists
    pub fn add_if_new(&mut self, element: CapturedElement) -> bool {
        if self.elements.iter().any(|e| e.same_target(&element)) {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Drop every element and reset the name counter
    pub fn clear(&mut self) {
        self.elements.clear();
        self.counter = 1;
    }

    /// Up to `n` most recent elements, newest first
    pub fn recent(&self, n: usize) -> Vec<&CapturedElement> {
        self.elements.iter().rev().take(n).collect()
    }
}

/// Shorten a selector for display
pub fn truncate_selector(selector: &str) -> String {
    crate::dom::document::truncate_with_ellipsis(selector, SELECTOR_DISPLAY_LEN)
}
