//! Executor stage: carrying out planned adaptation actions.
//!
//! Every executed decision produces exactly one audit event. Failures
//! are recorded as `Failed` events and never abort the loop; counters
//! advance only on confirmed actions.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::ExecuteError;
use crate::knowledge::KnowledgeState;
use crate::planner::{Decision, SwitchCause};
use crate::traits::{ActiveModelStore, AuditSink, EnergyMeter, PredictionLog, Trainer, VersionRepository};
use crate::types::{AuditEvent, AuditEventKind, AuditStatus, ModelId, VersionId};

/// EMA bonus granted to a family right after a version rollback, to
/// bias the loop toward stability while the restored version proves
/// itself.
pub const VMR_SCORE_BONUS: f64 = 0.1;

/// Executor stage.
pub struct Executor {
    active: Arc<dyn ActiveModelStore>,
    repo: Arc<dyn VersionRepository>,
    trainer: Arc<dyn Trainer>,
    audit: Arc<dyn AuditSink>,
    meter: Arc<dyn EnergyMeter>,
    log: Arc<dyn PredictionLog>,
}

impl Executor {
    pub fn new(
        active: Arc<dyn ActiveModelStore>,
        repo: Arc<dyn VersionRepository>,
        trainer: Arc<dyn Trainer>,
        audit: Arc<dyn AuditSink>,
        meter: Arc<dyn EnergyMeter>,
        log: Arc<dyn PredictionLog>,
    ) -> Self {
        Self {
            active,
            repo,
            trainer,
            audit,
            meter,
            log,
        }
    }

    /// Carry out `decision`. `None` is an idempotent no-op.
    ///
    /// The executor's own energy footprint over the action is metered
    /// and added to `mape_k_energy_uj`, apart from the inference energy
    /// the loop is minimizing. The caller persists the knowledge state
    /// afterwards.
    pub fn execute(
        &self,
        decision: Option<&Decision>,
        state: &mut KnowledgeState,
    ) -> Option<AuditEvent> {
        let decision = decision?;
        self.meter.begin();
        let event = match decision {
            Decision::Switch { to, cause } => self.switch(to, *cause, state),
            Decision::ReplaceVersion { version, kl } => self.replace_version(version, *kl, state),
            Decision::Retrain { family, min_kl } => self.retrain(family, *min_kl, state),
            Decision::SimpleSwitch { to } => self.simple_switch(to, state),
        };
        state.event_counters.mape_k_energy_uj += self.meter.end();

        if let Err(err) = self.audit.record(&event) {
            warn!(error = %err, "failed to append audit event");
        }
        Some(event)
    }

    fn switch(&self, to: &ModelId, cause: SwitchCause, state: &mut KnowledgeState) -> AuditEvent {
        match self.active.set_current(to) {
            Ok(()) => {
                state.event_counters.model_switches += 1;
                info!(model = %to, ?cause, "active model switched");
                AuditEvent::new(AuditEventKind::Switch, AuditStatus::Confirmed, self.log_row())
                    .with_model(to.clone())
                    .with_details(format!("cause: {cause:?}"))
            }
            Err(err) => {
                let err = ExecuteError::PointerWrite {
                    model: to.clone(),
                    reason: err.to_string(),
                };
                error!(error = %err, "model switch failed");
                AuditEvent::new(AuditEventKind::Switch, AuditStatus::Failed, self.log_row())
                    .with_model(to.clone())
                    .with_details(err.to_string())
            }
        }
    }

    fn replace_version(
        &self,
        version: &VersionId,
        kl: f64,
        state: &mut KnowledgeState,
    ) -> AuditEvent {
        let result = self
            .repo
            .activate(version)
            .and_then(|()| self.active.set_current(&version.family));
        match result {
            Ok(()) => {
                state.event_counters.vmr_events += 1;
                let boosted = state.inflate_ema_score(&version.family, VMR_SCORE_BONUS);
                info!(version = %version, kl = kl, ema_score = boosted, "version rollback executed");
                AuditEvent::new(AuditEventKind::Vmr, AuditStatus::Confirmed, self.log_row())
                    .with_model(version.family.clone())
                    .with_version(version.clone())
                    .with_details(format!("kl: {kl:.6}"))
            }
            Err(err) => {
                let err = ExecuteError::Activation {
                    version: version.clone(),
                    reason: err.to_string(),
                };
                error!(error = %err, "version rollback failed");
                AuditEvent::new(AuditEventKind::Vmr, AuditStatus::Failed, self.log_row())
                    .with_model(version.family.clone())
                    .with_version(version.clone())
                    .with_details(err.to_string())
            }
        }
    }

    fn retrain(&self, family: &ModelId, min_kl: f64, state: &mut KnowledgeState) -> AuditEvent {
        info!(family = %family, min_kl = min_kl, "retraining; loop blocks until it finishes");
        match self.trainer.retrain(family) {
            Ok(version) => {
                state.event_counters.retrains += 1;
                info!(version = %version, "retraining produced new version");
                AuditEvent::new(AuditEventKind::Retrain, AuditStatus::Confirmed, self.log_row())
                    .with_model(family.clone())
                    .with_version(version)
            }
            Err(err) => {
                let err = ExecuteError::Training {
                    family: family.clone(),
                    reason: err.to_string(),
                };
                error!(error = %err, "retraining failed");
                AuditEvent::new(AuditEventKind::Retrain, AuditStatus::Failed, self.log_row())
                    .with_model(family.clone())
                    .with_details(err.to_string())
            }
        }
    }

    fn simple_switch(&self, to: &ModelId, state: &mut KnowledgeState) -> AuditEvent {
        match self.active.set_current(to) {
            Ok(()) => {
                state.event_counters.simple_switches += 1;
                info!(model = %to, "baseline switch executed");
                AuditEvent::new(
                    AuditEventKind::SimpleSwitch,
                    AuditStatus::Confirmed,
                    self.log_row(),
                )
                .with_model(to.clone())
            }
            Err(err) => {
                let err = ExecuteError::PointerWrite {
                    model: to.clone(),
                    reason: err.to_string(),
                };
                error!(error = %err, "baseline switch failed");
                AuditEvent::new(
                    AuditEventKind::SimpleSwitch,
                    AuditStatus::Failed,
                    self.log_row(),
                )
                .with_model(to.clone())
                .with_details(err.to_string())
            }
        }
    }

    fn log_row(&self) -> u64 {
        match self.log.len() {
            Ok(len) => len,
            Err(err) => {
                warn!(error = %err, "could not read prediction-log length for audit event");
                0
            }
        }
    }
}
