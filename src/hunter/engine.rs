//! Capture engine: the per-page hunt state machine
//!
//! One engine lives for the lifetime of a page. It owns the capture session,
//! decides what a click captures, tracks hover highlights and persists the
//! session after every change.

use super::listeners::{EventKind, ListenerHandle, ListenerRegistry};
use super::naming::NameGenerator;
use super::resolver::{is_overlay, resolve_target};
use super::selector::synthesize;
use super::session::{CaptureSession, CapturedElement};
use super::uniqueness::{evaluate_counts, LocatorQuery, SelectorCounts};
use crate::config::HunterConfig;
use crate::dom::{Document, NodeId, Rect};
use crate::storage::{origin_of, PersistedSnapshot, SnapshotStore};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntState {
    Idle,
    Hunting,
}

/// A click as seen by the page: the element stack under the pointer
/// (topmost first) and the event's own target.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub stack: Vec<NodeId>,
    pub target: NodeId,
}

impl ClickEvent {
    /// Hit-test `doc` at a viewport point
    pub fn at(doc: &Document, x: f64, y: f64) -> Option<Self> {
        let stack = doc.elements_from_point(x, y);
        let target = *stack.first()?;
        Some(Self { stack, target })
    }
}

/// Transient "captured" flash shown next to the clicked element
#[derive(Debug, Clone, PartialEq)]
pub struct ClickFeedback {
    pub message: String,
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClickOutcome {
    /// Element the click resolved to, when hunting
    pub target: Option<NodeId>,
    /// Element appended to the session; `None` for duplicates
    pub captured: Option<CapturedElement>,
    /// The host must cancel the click's default action and propagation
    pub suppress_default: bool,
    pub feedback: Option<ClickFeedback>,
}

/// A click resolved to its target but not yet applied to the session
///
/// The live bridge recounts the locators against the real page between
/// [`CaptureEngine::begin_click`] and [`CaptureEngine::finish_click`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCapture {
    target: NodeId,
    element: Option<CapturedElement>,
    suppress_default: bool,
    rect: Option<Rect>,
}

impl PendingCapture {
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn element(&self) -> Option<&CapturedElement> {
        self.element.as_ref()
    }

    /// Locators to count for the candidate element
    pub fn locators(&self) -> Option<LocatorQuery> {
        self.element
            .as_ref()
            .map(|el| LocatorQuery::new(&el.attributes, &el.selector, &el.xpath))
    }

    /// Replace the counts taken from the snapshot
    pub fn set_counts(&mut self, counts: SelectorCounts) {
        if let Some(el) = self.element.as_mut() {
            el.counts = counts;
        }
    }
}

/// Status shown in the in-page overlay while hunting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStatus {
    pub capture_and_click: bool,
    pub captured: usize,
}

impl OverlayStatus {
    pub fn mode_label(&self) -> &'static str {
        if self.capture_and_click {
            "Capture & Click"
        } else {
            "Capture Only"
        }
    }
}

impl fmt::Display for OverlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Element Hunter active | Mode: {} | Captured: {} elements",
            self.mode_label(),
            self.captured
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundHandlers {
    click: ListenerHandle,
    mouse_over: ListenerHandle,
    mouse_out: ListenerHandle,
}

pub struct CaptureEngine {
    config: HunterConfig,
    session: CaptureSession,
    state: HuntState,
    listeners: ListenerRegistry,
    bound: Option<BoundHandlers>,
    highlighted: BTreeSet<NodeId>,
    store: Arc<dyn SnapshotStore>,
    page_url: String,
}

impl CaptureEngine {
    /// Fresh idle engine for a page, ignoring any persisted snapshot
    pub fn new(config: HunterConfig, store: Arc<dyn SnapshotStore>, page_url: &str) -> Self {
        Self {
            config,
            session: CaptureSession::new(),
            state: HuntState::Idle,
            listeners: ListenerRegistry::new(),
            bound: None,
            highlighted: BTreeSet::new(),
            store,
            page_url: page_url.to_string(),
        }
    }

    /// Engine for a freshly loaded page, restoring a fresh snapshot if one exists
    pub fn load(config: HunterConfig, store: Arc<dyn SnapshotStore>, page_url: &str) -> Self {
        let mut engine = Self::new(config, store, page_url);
        engine.restore_at(Utc::now());
        engine
    }

    /// Restore the persisted session if it is younger than the configured TTL
    ///
    /// Returns whether a snapshot was restored. A stale or unreadable snapshot
    /// leaves the engine idle and empty.
    pub fn restore_at(&mut self, now: DateTime<Utc>) -> bool {
        let snapshot = match self.store.load(&self.config.storage_key) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("⚠️  Could not read persisted session: {}", e);
                return false;
            }
        };
        if !snapshot.is_fresh(now, self.config.snapshot_ttl()) {
            log::info!("🕰️  Persisted session is stale, starting fresh");
            return false;
        }

        log::info!(
            "♻️  Restored {} captured elements (active: {})",
            snapshot.elements.len(),
            snapshot.is_active
        );
        self.session = CaptureSession::restore(
            snapshot.elements,
            snapshot.element_counter,
            snapshot.capture_and_click,
        );
        if snapshot.is_active {
            self.start_hunting();
        }
        true
    }

    pub fn config(&self) -> &HunterConfig {
        &self.config
    }

    pub fn state(&self) -> HuntState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == HuntState::Hunting
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn elements(&self) -> &[CapturedElement] {
        self.session.elements()
    }

    pub fn capture_and_click(&self) -> bool {
        self.session.capture_and_click()
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Elements currently carrying the hover highlight
    pub fn highlighted(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.highlighted.iter().copied()
    }

    /// Overlay contents; `None` while idle
    pub fn overlay(&self) -> Option<OverlayStatus> {
        self.is_active().then(|| OverlayStatus {
            capture_and_click: self.session.capture_and_click(),
            captured: self.session.len(),
        })
    }

    /// Flip between idle and hunting; returns the new active flag
    pub fn toggle(&mut self) -> bool {
        match self.state {
            HuntState::Idle => self.start_hunting(),
            HuntState::Hunting => self.stop_hunting(),
        }
        self.persist();
        self.is_active()
    }

    pub fn clear_elements(&mut self) {
        self.session.clear();
        log::info!("🧹 Cleared captured elements");
        self.persist();
    }

    pub fn set_capture_mode(&mut self, capture_and_click: bool) {
        self.session.set_capture_and_click(capture_and_click);
        log::info!(
            "🖱️  Capture mode: {}",
            if capture_and_click { "Capture & Click" } else { "Capture Only" }
        );
        self.persist();
    }

    fn start_hunting(&mut self) {
        if self.state == HuntState::Hunting {
            return;
        }
        self.bound = Some(BoundHandlers {
            click: self.listeners.attach(EventKind::Click),
            mouse_over: self.listeners.attach(EventKind::MouseOver),
            mouse_out: self.listeners.attach(EventKind::MouseOut),
        });
        self.state = HuntState::Hunting;
        log::info!("🎯 Element hunting started on {}", self.page_url);
    }

    fn stop_hunting(&mut self) {
        if let Some(bound) = self.bound.take() {
            self.listeners.detach(bound.click);
            self.listeners.detach(bound.mouse_over);
            self.listeners.detach(bound.mouse_out);
        }
        self.highlighted.clear();
        self.state = HuntState::Idle;
        log::info!("⏹️  Element hunting stopped");
    }

    /// Build a captured record for `node` without touching the session list
    ///
    /// The name counter still advances.
    pub fn extract(&mut self, doc: &Document, node: NodeId) -> Option<CapturedElement> {
        let el = doc.element(node)?;
        let synthesized = synthesize(doc, node, &self.config.selector);
        let counts = evaluate_counts(doc, node, &synthesized);
        let name = NameGenerator::new(&self.config.naming).generate(doc, node, self.session.counter_mut());

        Some(CapturedElement {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            tag_name: el.tag.clone(),
            text: doc.visible_text(node),
            attributes: el.attributes.clone(),
            selector: synthesized.selector,
            selector_type: synthesized.selector_type,
            xpath: synthesized.xpath,
            name,
            counts,
        })
    }

    pub fn on_click(&mut self, doc: &Document, event: &ClickEvent) -> ClickOutcome {
        match self.begin_click(doc, event) {
            Some(pending) => self.finish_click(pending),
            None => ClickOutcome::default(),
        }
    }

    /// Resolve a click and build its record; `None` when the click is ignored
    pub fn begin_click(&mut self, doc: &Document, event: &ClickEvent) -> Option<PendingCapture> {
        if !self.listeners.is_attached(EventKind::Click) {
            return None;
        }

        let target = resolve_target(doc, &event.stack, event.target, &self.config.resolver);
        if is_overlay(doc, target, &self.config.resolver) {
            return None;
        }

        Some(PendingCapture {
            target,
            suppress_default: !self.session.capture_and_click(),
            rect: doc.element(target).and_then(|el| el.rect),
            element: self.extract(doc, target),
        })
    }

    /// Append the pending record unless it is a duplicate
    pub fn finish_click(&mut self, pending: PendingCapture) -> ClickOutcome {
        let PendingCapture {
            target,
            element,
            suppress_default,
            rect,
        } = pending;

        let captured = element.and_then(|element| {
            if self.session.add_if_new(element.clone()) {
                log::info!("📌 Captured {} ({})", element.name, element.selector);
                self.persist();
                Some(element)
            } else {
                log::debug!("Already captured {}", element.selector);
                None
            }
        });

        ClickOutcome {
            target: Some(target),
            feedback: captured.as_ref().map(|_| ClickFeedback {
                message: "Element captured".to_string(),
                rect,
            }),
            captured,
            suppress_default,
        }
    }

    pub fn on_mouse_over(&mut self, doc: &Document, node: NodeId) {
        if !self.listeners.is_attached(EventKind::MouseOver)
            || !doc.is_element(node)
            || is_overlay(doc, node, &self.config.resolver)
        {
            return;
        }
        self.highlighted.insert(node);
    }

    pub fn on_mouse_out(&mut self, node: NodeId) {
        if self.listeners.is_attached(EventKind::MouseOut) {
            self.highlighted.remove(&node);
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> PersistedSnapshot {
        PersistedSnapshot {
            is_active: self.is_active(),
            elements: self.session.elements().to_vec(),
            element_counter: self.session.counter(),
            capture_and_click: self.session.capture_and_click(),
            url: origin_of(&self.page_url),
            timestamp: now.timestamp_millis(),
        }
    }

    fn persist(&self) {
        let snapshot = self.snapshot(Utc::now());
        if let Err(e) = self.store.save(&self.config.storage_key, &snapshot) {
            log::warn!("⚠️  Failed to persist session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementData;
    use crate::storage::MemoryStore;

    fn engine(store: &MemoryStore) -> CaptureEngine {
        CaptureEngine::new(HunterConfig::default(), Arc::new(store.clone()), "https://shop.example.com/p/1")
    }

    fn page() -> (Document, NodeId) {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let button = doc.append_element(
            body,
            ElementData::new("button")
                .with_id("submit-btn")
                .with_rect(Rect::new(10.0, 10.0, 80.0, 30.0)),
        );
        doc.append_text(button, "Submit");
        (doc, button)
    }

    #[test]
    fn test_toggle_attaches_and_detaches_listeners() {
        let store = MemoryStore::new();
        let mut engine = engine(&store);
        assert!(engine.toggle());
        assert_eq!(engine.listeners().len(), 3);
        assert!(!engine.toggle());
        assert!(engine.listeners().is_empty());
        assert_eq!(engine.state(), HuntState::Idle);
    }

    #[test]
    fn test_idle_click_is_ignored() {
        let store = MemoryStore::new();
        let mut engine = engine(&store);
        let (doc, button) = page();

        let outcome = engine.on_click(&doc, &ClickEvent { stack: vec![button], target: button });
        assert_eq!(outcome, ClickOutcome::default());
        assert!(engine.elements().is_empty());
    }

    #[test]
    fn test_hover_sweep_on_stop() {
        let store = MemoryStore::new();
        let mut engine = engine(&store);
        let (doc, button) = page();
        engine.toggle();
        engine.on_mouse_over(&doc, button);
        assert_eq!(engine.highlighted().count(), 1);
        engine.toggle();
        assert_eq!(engine.highlighted().count(), 0);
    }

    #[test]
    fn test_overlay_status_text() {
        let status = OverlayStatus { capture_and_click: true, captured: 2 };
        assert_eq!(status.to_string(), "Element Hunter active | Mode: Capture & Click | Captured: 2 elements");
    }

    #[test]
    fn test_snapshot_stores_origin_only() {
        let store = MemoryStore::new();
        let mut engine = engine(&store);
        engine.toggle();
        let saved = store.load("elementHunterData").unwrap().unwrap();
        assert_eq!(saved.url, "https://shop.example.com");
        assert!(saved.is_active);
    }
}
