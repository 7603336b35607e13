//! Command inbox for coordinator-driven deployments.
//!
//! An external coordinator delivers at most one pending tactic
//! identifier; the loop consumes it exactly once and leaves the slot
//! empty. File-backed implementations live in `adapt-store`.

use parking_lot::Mutex;

use crate::error::StoreError;

/// Tactic identifiers a coordinator may deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run one full adaptation cycle and switch to the globally best
    /// model if a switch is warranted
    ExecuteMapePlan,
    /// Run version search against the current live distribution and
    /// roll back or retrain
    HandleDataDrift,
    /// Run the non-adaptive baseline switch
    SwitchModelBaseline,
}

impl Command {
    /// Parse a delivered tactic identifier. Unknown identifiers yield
    /// `None`; the loop logs and ignores them.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "execute_mape_plan" => Some(Self::ExecuteMapePlan),
            "handle_data_drift" => Some(Self::HandleDataDrift),
            "switch_model_baseline" => Some(Self::SwitchModelBaseline),
            _ => None,
        }
    }
}

/// Single-slot command inbox.
pub trait CommandInbox: Send + Sync {
    /// Pending command, if any, without consuming it.
    fn peek(&self) -> Result<Option<String>, StoreError>;

    /// Take the pending command, leaving the slot empty.
    fn consume(&self) -> Result<Option<String>, StoreError>;
}

/// In-process inbox backed by a mutex slot.
#[derive(Debug, Default)]
pub struct InMemoryInbox {
    slot: Mutex<Option<String>>,
}

impl InMemoryInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a command, replacing any pending one.
    pub fn post(&self, command: impl Into<String>) {
        *self.slot.lock() = Some(command.into());
    }
}

impl CommandInbox for InMemoryInbox {
    fn peek(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.lock().clone())
    }

    fn consume(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.lock().take())
    }
}
