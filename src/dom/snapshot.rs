//! Serialized page snapshots
//!
//! The live bridge evaluates `dom_snapshot.js` in the page and gets back a flat
//! node list in document order, each node pointing at its parent by index (the
//! same parallel-array idea as CDP's `DOMSnapshot.captureSnapshot`), plus the
//! element stack under the pointer.

use super::document::{Document, ElementData, NodeId, Rect};
use crate::error::{HunterError, Result};
use serde::{Deserialize, Serialize};

/// Raw snapshot returned by the page script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomSnapshot {
    /// Full page URL
    pub url: String,

    /// Nodes in document order; index 0 is the first child of the document
    pub nodes: Vec<SnapshotNode>,

    /// Node indexes under the pointer, topmost first
    #[serde(default)]
    pub stack: Vec<usize>,

    /// Index of the original event target, if any
    #[serde(default)]
    pub target: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SnapshotNode {
    Element {
        /// Parent node index; `None` for children of the document
        parent: Option<usize>,
        tag: String,
        #[serde(default)]
        attributes: Vec<(String, String)>,
        #[serde(default)]
        value: Option<String>,
        /// `[x, y, width, height]` in viewport coordinates
        #[serde(default)]
        rect: Option<[f64; 4]>,
        #[serde(default, rename = "clickHandler")]
        click_handler: bool,
    },
    Text {
        parent: Option<usize>,
        text: String,
    },
}

/// A snapshot resolved into a [`Document`]
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub url: String,
    pub document: Document,
    pub stack: Vec<NodeId>,
    pub target: Option<NodeId>,
}

impl DomSnapshot {
    pub fn into_capture(self) -> Result<PageCapture> {
        let mut document = Document::new();
        let mut ids: Vec<NodeId> = Vec::with_capacity(self.nodes.len());

        for (index, node) in self.nodes.into_iter().enumerate() {
            let parent = match node.parent() {
                None => document.root(),
                Some(p) if p < index => ids[p],
                Some(p) => {
                    return Err(HunterError::InvalidSnapshot(format!(
                        "node {} references parent {} that does not precede it",
                        index, p
                    )))
                }
            };
            if parent != document.root() && !document.is_element(parent) {
                return Err(HunterError::InvalidSnapshot(format!(
                    "node {} is attached to a text node",
                    index
                )));
            }

            let id = match node {
                SnapshotNode::Element {
                    tag,
                    attributes,
                    value,
                    rect,
                    click_handler,
                    ..
                } => {
                    let mut element = ElementData::new(&tag);
                    element.attributes = attributes.into_iter().collect();
                    element.value = value;
                    element.rect = rect.map(|[x, y, w, h]| Rect::new(x, y, w, h));
                    element.click_handler = click_handler;
                    document.append_element(parent, element)
                }
                SnapshotNode::Text { text, .. } => document.append_text(parent, &text),
            };
            ids.push(id);
        }

        let resolve = |index: usize| {
            ids.get(index).copied().ok_or_else(|| {
                HunterError::InvalidSnapshot(format!("node index {} out of range", index))
            })
        };
        let stack = self
            .stack
            .iter()
            .map(|i| resolve(*i))
            .collect::<Result<Vec<_>>>()?;
        let target = self.target.map(resolve).transpose()?;

        Ok(PageCapture {
            url: self.url,
            document,
            stack,
            target,
        })
    }
}

impl SnapshotNode {
    fn parent(&self) -> Option<usize> {
        match self {
            SnapshotNode::Element { parent, .. } | SnapshotNode::Text { parent, .. } => *parent,
        }
    }
}
