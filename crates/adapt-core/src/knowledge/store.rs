//! Persistence contract for the knowledge state.

use parking_lot::Mutex;

use crate::error::StoreError;

use super::KnowledgeState;

/// Persistence backend for [`KnowledgeState`].
///
/// The loop persists only at well-defined checkpoints (after the EMA
/// update, after the threshold/recovery update, after an executor
/// mutation) so a failed cycle never leaves a partial update behind.
pub trait KnowledgeStore: Send + Sync {
    /// Load the persisted state. A missing backing file is a fresh
    /// deployment and yields `Ok(None)`, not an error.
    fn load(&self) -> Result<Option<KnowledgeState>, StoreError>;

    /// Persist the full state.
    fn save(&self, state: &KnowledgeState) -> Result<(), StoreError>;
}

/// In-memory knowledge store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeStore {
    slot: Mutex<Option<KnowledgeState>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently persisted snapshot, if any.
    pub fn snapshot(&self) -> Option<KnowledgeState> {
        self.slot.lock().clone()
    }
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn load(&self) -> Result<Option<KnowledgeState>, StoreError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, state: &KnowledgeState) -> Result<(), StoreError> {
        *self.slot.lock() = Some(state.clone());
        Ok(())
    }
}
