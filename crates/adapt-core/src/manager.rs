//! Loop manager: wires the stages together and drives them cyclically.
//!
//! One manager per managed-system instance. The knowledge state is
//! owned here and handed mutably to each stage in turn; it is persisted
//! only at checkpoints (after the EMA update, after the
//! threshold/recovery update, after an executor mutation) so a failed
//! cycle never leaves a partial update behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::analyzer::{Analyzer, Verdict, ViolationReason};
use crate::config::Thresholds;
use crate::error::{AdaptError, AdaptResult};
use crate::executor::Executor;
use crate::inbox::{Command, CommandInbox};
use crate::knowledge::{KnowledgeState, KnowledgeStore, EMA_SEED};
use crate::monitor::Monitor;
use crate::planner::Planner;
use crate::selector::VersionSelector;
use crate::traits::ActiveModelStore;
use crate::types::{AuditEvent, Histogram, ModelId};

/// How cycles are triggered. Modes are mutually exclusive per
/// deployment, not concurrent paths in one instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerMode {
    /// Fixed-interval local timer; a drift cycle runs every
    /// `drift_every` adaptation cycles (0 disables drift checks)
    LocalTimer {
        /// Sleep between cycles
        interval: Duration,
        /// Drift-cycle cadence in adaptation cycles
        drift_every: u32,
    },
    /// Poll the command inbox and run only what a coordinator delivers
    Coordinator {
        /// Sleep between inbox polls
        poll_interval: Duration,
    },
}

/// Drives Monitor, Analyzer, Planner and Executor over the shared
/// knowledge state.
pub struct AdaptationManager {
    monitor: Monitor,
    analyzer: Analyzer,
    planner: Planner,
    executor: Executor,
    selector: VersionSelector,
    knowledge: Arc<dyn KnowledgeStore>,
    active: Arc<dyn ActiveModelStore>,
    inbox: Option<Arc<dyn CommandInbox>>,
    state: KnowledgeState,
    shutdown: Arc<AtomicBool>,
}

impl AdaptationManager {
    /// Build a manager, loading persisted knowledge or starting fresh.
    ///
    /// `models` is the deployment's roster of interchangeable model
    /// families; each gets an EMA entry seeded at [`EMA_SEED`] if the
    /// persisted state does not know it yet. A malformed `thresholds`
    /// is fatal.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        thresholds: Thresholds,
        models: Vec<ModelId>,
        monitor: Monitor,
        analyzer: Analyzer,
        planner: Planner,
        executor: Executor,
        selector: VersionSelector,
        knowledge: Arc<dyn KnowledgeStore>,
        active: Arc<dyn ActiveModelStore>,
        inbox: Option<Arc<dyn CommandInbox>>,
    ) -> AdaptResult<Self> {
        thresholds.validate()?;

        let mut state = match knowledge.load()? {
            Some(state) => {
                info!(
                    cursor = state.last_processed_row,
                    "resuming from persisted knowledge state"
                );
                state
            }
            None => {
                info!("no persisted knowledge state; starting fresh");
                KnowledgeState::new(thresholds.max_energy)
            }
        };
        for model in &models {
            if !state.ema_scores.contains_key(model) {
                state.set_ema_score(model, EMA_SEED);
            }
        }
        knowledge.save(&state)?;

        Ok(Self {
            monitor,
            analyzer,
            planner,
            executor,
            selector,
            knowledge,
            active,
            inbox,
            state,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked between cycles; setting it stops the loop before
    /// the next cycle starts. An in-flight cycle (including a blocking
    /// retrain) is never interrupted.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Current knowledge state, for diagnostics.
    pub fn state(&self) -> &KnowledgeState {
        &self.state
    }

    /// Run until the shutdown flag is set. Recoverable errors are
    /// logged and swallowed at the cycle boundary; only a
    /// non-recoverable error ends the loop early.
    pub fn run(&mut self, mode: TriggerMode) -> AdaptResult<()> {
        match mode {
            TriggerMode::LocalTimer {
                interval,
                drift_every,
            } => {
                let mut cycle: u64 = 0;
                while !self.shutdown.load(Ordering::SeqCst) {
                    cycle += 1;
                    let result = self.run_adaptation_cycle();
                    Self::swallow_recoverable(result)?;
                    if drift_every > 0 && cycle % u64::from(drift_every) == 0 {
                        let result = self.run_drift_cycle();
                        Self::swallow_recoverable(result)?;
                    }
                    thread::sleep(interval);
                }
            }
            TriggerMode::Coordinator { poll_interval } => {
                let inbox = self.inbox.clone().ok_or_else(|| {
                    AdaptError::Validation("coordinator mode requires a command inbox".into())
                })?;
                while !self.shutdown.load(Ordering::SeqCst) {
                    match inbox.consume() {
                        Ok(Some(raw)) => {
                            let result = self.handle_command(&raw);
                            Self::swallow_recoverable(result)?;
                        }
                        Ok(None) => {}
                        Err(err) => warn!(error = %err, "command inbox poll failed"),
                    }
                    thread::sleep(poll_interval);
                }
            }
        }
        info!("shutdown requested; loop stopped");
        Ok(())
    }

    /// One Monitor-Analyze-Plan-Execute cycle.
    ///
    /// The exploration draw happens before the verdict is consulted,
    /// so exploration can fire independent of any violation.
    pub fn run_adaptation_cycle(&mut self) -> AdaptResult<Option<AuditEvent>> {
        let Some(summary) = self.monitor.monitor_performance(&mut self.state)? else {
            return Ok(None);
        };
        if !summary.cached {
            self.checkpoint()?;
        }
        let current = summary.model.clone();

        let decision = match self.planner.try_explore(&self.state, &current) {
            Some(decision) => Some(decision),
            None => {
                let verdict = self.analyzer.analyze(&summary, &mut self.state);
                self.checkpoint()?;
                self.planner.plan_from_verdict(&verdict, &self.state, &current)
            }
        };

        let event = self.executor.execute(decision.as_ref(), &mut self.state);
        if event.is_some() {
            self.checkpoint()?;
        }
        Ok(event)
    }

    /// One drift cycle: measure drift locally and, on a ceiling
    /// breach, roll back or retrain.
    pub fn run_drift_cycle(&mut self) -> AdaptResult<Option<AuditEvent>> {
        let Some(reading) = self.monitor.monitor_drift()? else {
            return Ok(None);
        };
        if !self.analyzer.drift_detected(&reading) {
            return Ok(None);
        }
        self.adapt_to_distribution(&reading.current)
    }

    /// Baseline switch with no scoring input.
    pub fn run_simple_switch(&mut self) -> AdaptResult<Option<AuditEvent>> {
        let Some(current) = self.active.current()? else {
            warn!("no model currently active; baseline switch skipped");
            return Ok(None);
        };
        let decision = self.planner.plan_simple_switch(&self.state, &current);
        let event = self.executor.execute(decision.as_ref(), &mut self.state);
        if event.is_some() {
            self.checkpoint()?;
        }
        Ok(event)
    }

    /// Handle one coordinator-delivered tactic identifier. Unknown
    /// identifiers are logged and ignored.
    pub fn handle_command(&mut self, raw: &str) -> AdaptResult<Option<AuditEvent>> {
        let Some(command) = Command::parse(raw) else {
            warn!(command = raw, "unknown command ignored");
            return Ok(None);
        };
        info!(?command, "handling coordinator command");
        match command {
            Command::ExecuteMapePlan => self.run_external_cycle(),
            Command::HandleDataDrift => {
                let Some(distribution) = self.monitor.current_distribution()? else {
                    warn!("no live distribution available; drift command skipped");
                    return Ok(None);
                };
                self.adapt_to_distribution(&distribution)
            }
            Command::SwitchModelBaseline => self.run_simple_switch(),
        }
    }

    /// Externally commanded adaptation: refresh the summary, then
    /// switch to the globally best model without requiring a local
    /// violation.
    fn run_external_cycle(&mut self) -> AdaptResult<Option<AuditEvent>> {
        let Some(summary) = self.monitor.monitor_performance(&mut self.state)? else {
            return Ok(None);
        };
        if !summary.cached {
            self.checkpoint()?;
        }
        let current = summary.model.clone();

        let decision = match self.planner.try_explore(&self.state, &current) {
            Some(decision) => Some(decision),
            None => {
                let verdict = Verdict {
                    switch_needed: true,
                    reason: Some(ViolationReason::External),
                    score_violated: false,
                    energy_violated: false,
                    in_recovery: false,
                    score: summary.ema_score,
                };
                self.planner.plan_from_verdict(&verdict, &self.state, &current)
            }
        };

        let event = self.executor.execute(decision.as_ref(), &mut self.state);
        if event.is_some() {
            self.checkpoint()?;
        }
        Ok(event)
    }

    /// Version search against `distribution`, then rollback or
    /// retrain.
    fn adapt_to_distribution(&mut self, distribution: &Histogram) -> AdaptResult<Option<AuditEvent>> {
        let Some(active) = self.active.current()? else {
            warn!("no model currently active; version search skipped");
            return Ok(None);
        };
        let outcome = self
            .selector
            .select_across_families(distribution, &mut self.state)?;
        self.checkpoint()?;
        let decision = self.planner.plan_drift(outcome, &active);
        let event = self.executor.execute(Some(&decision), &mut self.state);
        self.checkpoint()?;
        Ok(event)
    }

    fn checkpoint(&self) -> AdaptResult<()> {
        self.knowledge.save(&self.state)?;
        Ok(())
    }

    fn swallow_recoverable<T>(result: AdaptResult<T>) -> AdaptResult<()> {
        match result {
            Ok(_) => Ok(()),
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "cycle failed; continuing with next cycle");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
