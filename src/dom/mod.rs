pub mod css;
pub mod document;
pub mod snapshot;
pub mod xpath;

pub use document::{Attributes, Document, ElementData, NodeData, NodeId, Rect};
pub use snapshot::{DomSnapshot, PageCapture, SnapshotNode};
