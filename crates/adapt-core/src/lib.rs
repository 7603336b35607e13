//! Self-adaptation engine for model-variant inference services.
//!
//! A Monitor-Analyze-Plan-Execute loop over a shared knowledge state
//! decides, from streaming performance/energy/drift telemetry, which
//! model variant should be active, when to roll back to a previously
//! trained version, and when a full retrain is warranted.
//!
//! The loop's collaborators (prediction log, active-model pointer,
//! version artifacts, trainer, command inbox) are trait seams; durable
//! file-backed implementations live in the `adapt-store` crate and
//! in-memory doubles in [`stubs`].

pub mod analyzer;
pub mod boundary;
pub mod config;
pub mod error;
pub mod executor;
pub mod inbox;
pub mod knowledge;
pub mod manager;
pub mod monitor;
pub mod planner;
pub mod selector;
pub mod stubs;
pub mod traits;
pub mod types;

pub use analyzer::{Analyzer, Verdict, ViolationReason};
pub use boundary::{BoundaryExpr, Condition};
pub use config::{MonitorConfig, Thresholds};
pub use error::{AdaptError, AdaptResult, ConfigError, ExecuteError, StoreError, TrainingError};
pub use executor::{Executor, VMR_SCORE_BONUS};
pub use inbox::{Command, CommandInbox, InMemoryInbox};
pub use knowledge::{InMemoryKnowledgeStore, KnowledgeState, KnowledgeStore, EMA_SEED};
pub use manager::{AdaptationManager, TriggerMode};
pub use monitor::{
    AccuracyProxy, DriftReading, DriftSignal, LuminanceSignal, MeanConfidence, Monitor, RSquared,
    Summary, TargetValueSignal,
};
pub use planner::{Decision, Planner, SwitchCause};
pub use selector::{SelectionOutcome, VersionSelector};
pub use traits::{
    ActiveModelStore, AuditSink, EnergyMeter, NullEnergyMeter, PredictionLog, Trainer,
    VersionRepository,
};
pub use types::{
    AuditEvent, AuditEventKind, AuditStatus, EventCounters, Histogram, ModelId, ModelVersion,
    PredictionRecord, VersionId, VersionSearchOutcome, KL_EPSILON, KL_MAX,
};
