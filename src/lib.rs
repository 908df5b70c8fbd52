pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod hunter;
pub mod server;
pub mod storage;

//  Re-export commonly used items
pub use browser::chrome::{ChromeDriver, ConnectionMode};
pub use config::HunterConfig;
pub use dom::{Document, ElementData, NodeId, PageCapture, Rect};
pub use error::{HunterError, Result};
pub use export::{automation_map, detailed_export, AutomationMap, DetailedExport};
pub use hunter::{
    AutomationLocator, CaptureEngine, CaptureSession, CapturedElement, ClickEvent, ClickOutcome,
    Command, HuntState, LocatorKind, OverlayStatus, Reply, SelectorCounts, SelectorType,
};
pub use storage::{JsonFileStore, MemoryStore, PersistedSnapshot, SnapshotStore};
