//! Dispatch worker - the only task that touches the commander

use super::queue::{CommandOutcome, CommandReport, Job, Slots};
use crate::commander::{Commander, CommanderError};
use booster_shared::state_machine::{is_valid_transition, DispatchEvent, TransitionResult};
use booster_shared::DispatchError;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Executes jobs one at a time against the owned commander
pub(crate) struct Worker {
    commander: Box<dyn Commander>,
    jobs: mpsc::Receiver<Job>,
    slots: Arc<Mutex<Slots>>,
}

impl Worker {
    pub(crate) fn new(
        commander: Box<dyn Commander>,
        jobs: mpsc::Receiver<Job>,
        slots: Arc<Mutex<Slots>>,
    ) -> Self {
        Self {
            commander,
            jobs,
            slots,
        }
    }

    /// Run until every sender is gone
    pub(crate) async fn run(mut self) {
        info!("[WORKER] Started ({} robot)", self.commander.kind());

        while let Some(job) = self.jobs.recv().await {
            let kind = job.command.kind();
            let started = Instant::now();
            debug!("[WORKER] Executing command {} ({})", job.command_id, kind);

            let result = self.execute(&job).await;
            debug_assert!(
                !self.commander.status().busy,
                "commander still busy after command {}",
                job.command_id
            );

            let event = match &result {
                Ok(CommandOutcome::Completed) => DispatchEvent::Completed,
                Ok(CommandOutcome::Cancelled) => DispatchEvent::Cancelled,
                Err(_) => DispatchEvent::Faulted,
            };
            self.release(event);

            let elapsed = started.elapsed();
            let result = match result {
                Ok(outcome) => {
                    info!(
                        "[WORKER] Command {} ({}) {:?} after {:?}",
                        job.command_id, kind, outcome, elapsed
                    );
                    Ok(CommandReport {
                        command_id: job.command_id,
                        kind,
                        outcome,
                        elapsed,
                    })
                }
                Err(e) => {
                    error!("[WORKER] Command {} ({}) failed: {}", job.command_id, kind, e);
                    Err(DispatchError::BackendFault {
                        command_id: job.command_id,
                        message: e.to_string(),
                    })
                }
            };

            // The submitter may have dropped its ticket
            let _ = job.reply.send(result);
        }

        info!("[WORKER] Stopped");
    }

    async fn execute(&mut self, job: &Job) -> Result<CommandOutcome, CommanderError> {
        let kind = job.command.kind();

        if let Some(direction) = kind.direction() {
            self.commander.move_robot(direction).await?;
            return Ok(CommandOutcome::Completed);
        }

        if kind.is_gesture() {
            return self.wave(job).await;
        }

        // Cancel submissions are applied by the queue and never get here
        self.commander.cancel_gesture().await?;
        Ok(CommandOutcome::Completed)
    }

    async fn wave(&mut self, job: &Job) -> Result<CommandOutcome, CommanderError> {
        let duration = job.command.gesture_duration();

        let cancelled = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => true,
            result = self.commander.wave_gesture(duration) => {
                result?;
                false
            }
        };

        if !cancelled {
            return Ok(CommandOutcome::Completed);
        }

        debug!("[WORKER] Gesture {} cancelled, closing hand", job.command_id);
        self.commander.cancel_gesture().await?;
        Ok(CommandOutcome::Cancelled)
    }

    fn release(&self, event: DispatchEvent) {
        let mut slots = self.slots.lock();
        let before = slots.fsm.state();

        match slots.release(event) {
            TransitionResult::Promoted => {
                debug!("[WORKER] Promoting pending command");
            }
            TransitionResult::Invalid { from, event } => {
                warn!("[WORKER] Ignoring {:?} in state {:?}", event, from);
            }
            _ => {}
        }

        debug_assert!(is_valid_transition(before, slots.fsm.state()));
    }
}
