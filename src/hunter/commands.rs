//! Inbound commands from the control surface and their replies

use super::engine::CaptureEngine;
use super::session::CapturedElement;
use crate::error::{HunterError, Result};
use crate::storage::SnapshotStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    Toggle,
    GetElements,
    ClearElements,
    SetCaptureMode {
        #[serde(rename = "captureAndClick")]
        capture_and_click: bool,
    },
    GetMode,
    GetStatus,
}

impl Command {
    /// Whether the command only reads state
    pub fn is_query(&self) -> bool {
        matches!(self, Command::GetElements | Command::GetMode | Command::GetStatus)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Toggled {
        status: &'static str,
        active: bool,
    },
    Elements {
        elements: Vec<CapturedElement>,
    },
    Cleared {
        status: &'static str,
    },
    ModeUpdated {
        status: &'static str,
        #[serde(rename = "captureAndClick")]
        capture_and_click: bool,
    },
    Mode {
        #[serde(rename = "captureAndClick")]
        capture_and_click: bool,
    },
    Status {
        #[serde(rename = "isActive")]
        is_active: bool,
    },
}

impl CaptureEngine {
    pub fn handle(&mut self, command: Command) -> Reply {
        log::debug!("📨 Command: {:?}", command);
        match command {
            Command::Toggle => Reply::Toggled {
                status: "toggled",
                active: self.toggle(),
            },
            Command::GetElements => Reply::Elements {
                elements: self.elements().to_vec(),
            },
            Command::ClearElements => {
                self.clear_elements();
                Reply::Cleared { status: "cleared" }
            }
            Command::SetCaptureMode { capture_and_click } => {
                self.set_capture_mode(capture_and_click);
                Reply::ModeUpdated {
                    status: "mode_updated",
                    capture_and_click,
                }
            }
            Command::GetMode => Reply::Mode {
                capture_and_click: self.capture_and_click(),
            },
            Command::GetStatus => Reply::Status {
                is_active: self.is_active(),
            },
        }
    }
}

/// Answer a command from the live engine, or from the persisted snapshot when
/// no engine is loaded on the page.
///
/// Only queries can be answered without an engine; a stale or missing
/// snapshot reads as an empty idle session.
pub fn query_with_fallback(
    engine: Option<&mut CaptureEngine>,
    store: &dyn SnapshotStore,
    storage_key: &str,
    ttl: Duration,
    command: Command,
    now: DateTime<Utc>,
) -> Result<Reply> {
    if let Some(engine) = engine {
        return Ok(engine.handle(command));
    }
    if !command.is_query() {
        return Err(HunterError::EngineNotLoaded);
    }

    log::warn!("⚠️  No capture engine loaded, answering from persisted session");
    let snapshot = store
        .load(storage_key)?
        .filter(|s| s.is_fresh(now, ttl));

    Ok(match command {
        Command::GetElements => Reply::Elements {
            elements: snapshot.map(|s| s.elements).unwrap_or_default(),
        },
        Command::GetMode => Reply::Mode {
            capture_and_click: snapshot.map(|s| s.capture_and_click).unwrap_or(false),
        },
        _ => Reply::Status {
            is_active: snapshot.map(|s| s.is_active).unwrap_or(false),
        },
    })
}
