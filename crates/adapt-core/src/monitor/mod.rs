//! Monitor stage: point-in-time performance/energy summaries and
//! distributional drift readings over the prediction log.
//!
//! The per-variant differences (how accuracy is proxied, what signal
//! drift is measured on) are strategy objects; the loop itself is
//! written once.

mod drift;
mod performance;
mod proxy;

pub use drift::{DriftReading, DriftSignal, LuminanceSignal, TargetValueSignal};
pub use performance::{Monitor, Summary};
pub use proxy::{AccuracyProxy, MeanConfidence, RSquared};
