pub mod commands;
pub mod engine;
pub mod listeners;
pub mod naming;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod tables;
pub mod uniqueness;

pub use commands::{query_with_fallback, Command, Reply};
pub use engine::{
    CaptureEngine, ClickEvent, ClickFeedback, ClickOutcome, HuntState, OverlayStatus, PendingCapture,
};
pub use listeners::{EventKind, ListenerHandle, ListenerRegistry};
pub use naming::NameGenerator;
pub use resolver::{resolve_target, ResolverConfig};
pub use selector::{synthesize, xpath_fallback, SelectorConfig, SelectorType, SynthesizedSelector};
pub use session::{truncate_selector, CaptureSession, CapturedElement};
pub use tables::{ContextKeyword, NamingTables};
pub use uniqueness::{
    best_locator, evaluate_counts, AutomationLocator, LocatorKind, LocatorQuery, SelectorCounts,
};
