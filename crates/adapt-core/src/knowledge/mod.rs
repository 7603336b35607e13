//! Shared knowledge of the adaptation loop.
//!
//! The knowledge state is an explicit, injectable object: every
//! component receives it as a parameter instead of touching ambient
//! globals, so regression and vision instances can run side by side
//! and tests can instantiate isolated state.

mod state;
mod store;

pub use state::{KnowledgeState, EMA_SEED};
pub use store::{InMemoryKnowledgeStore, KnowledgeStore};
