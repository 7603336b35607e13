//! File-backed implementations of the adaptation engine's collaborator
//! seams.
//!
//! Matches the layout the inference and training collaborators already
//! use: a JSON knowledge file, a JSONL prediction log, a pointer file
//! for the active model, version artifacts with JSON fingerprints in a
//! directory, a single-slot command file, and a JSONL audit log. All
//! stores assume the effectively single-writer access pattern of the
//! loop; writes that must not be observed half-done go through a
//! temp-file rename.

mod active_model;
mod events;
mod inbox;
mod knowledge;
mod predictions;
mod versions;

pub use active_model::FileActiveModel;
pub use events::JsonlAuditLog;
pub use inbox::FileInbox;
pub use knowledge::JsonKnowledgeStore;
pub use predictions::JsonlPredictionLog;
pub use versions::DirVersionRepository;
