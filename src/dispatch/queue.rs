//! Command dispatch queue - admits commands and hands them to the worker

use super::cancel::CancelSignal;
use super::worker::Worker;
use crate::commander::Commander;
use booster_shared::schema::{CancelReply, SubmitReply};
use booster_shared::state_machine::{BusyStateMachine, DispatchEvent, TransitionResult};
use booster_shared::{
    motion, Admission, Command, CommandKind, CommanderState, DispatchError, RobotKind,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// How a command that did not fault ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Ran for its full configured duration
    Completed,
    /// Gesture stopped early by a cancel request
    Cancelled,
}

/// Final report for an executed command
#[derive(Debug, Clone)]
pub struct CommandReport {
    pub command_id: u64,
    pub kind: CommandKind,
    pub outcome: CommandOutcome,
    /// Time spent executing, not counting time in the pending slot
    pub elapsed: Duration,
}

/// What a submitter eventually receives
pub type CommandResult = Result<CommandReport, DispatchError>;

/// A command holding the executing or the pending slot
#[derive(Debug, Clone)]
pub(crate) struct SlotEntry {
    pub command_id: u64,
    pub kind: CommandKind,
    pub cancel: Arc<CancelSignal>,
}

/// State shared between submitters and the worker
#[derive(Debug, Default)]
pub(crate) struct Slots {
    pub fsm: BusyStateMachine,
    pub active: Option<SlotEntry>,
    pub pending: Option<SlotEntry>,
}

impl Slots {
    /// Apply a terminal event for the active command
    pub(crate) fn release(&mut self, event: DispatchEvent) -> TransitionResult {
        let result = self.fsm.process_event(event);
        match result {
            TransitionResult::Released => self.active = None,
            TransitionResult::Promoted => self.active = self.pending.take(),
            _ => {}
        }
        result
    }

    /// Undo an admission whose job never reached the worker
    fn withdraw(&mut self, admission: Admission) {
        self.fsm.process_event(DispatchEvent::Withdrawn);
        match admission {
            Admission::Queued => self.pending = None,
            Admission::Running | Admission::Immediate => self.active = None,
        }
    }
}

/// Work item handed to the worker
#[derive(Debug)]
pub(crate) struct Job {
    pub command_id: u64,
    pub command: Command,
    pub cancel: Arc<CancelSignal>,
    pub reply: oneshot::Sender<CommandResult>,
}

/// Handle for an accepted submission
#[derive(Debug)]
pub struct Ticket {
    command_id: u64,
    kind: CommandKind,
    admission: Admission,
    result_rx: oneshot::Receiver<CommandResult>,
}

impl Ticket {
    pub fn command_id(&self) -> u64 {
        self.command_id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn admission(&self) -> Admission {
        self.admission
    }

    /// Submission result as relayed to callers
    pub fn reply(&self) -> SubmitReply {
        SubmitReply {
            accepted: true,
            queued: self.admission.is_queued(),
            command_id: Some(self.command_id),
        }
    }

    /// Wait for the command to reach a terminal state
    pub async fn outcome(self) -> CommandResult {
        self.result_rx
            .await
            .unwrap_or(Err(DispatchError::WorkerStopped))
    }
}

/// Serializes all robot commands through a single worker
///
/// At most one command executes and at most one waits behind it. Further
/// submissions are rejected with [`DispatchError::QueueFull`] instead of
/// blocking. Gesture cancellation bypasses the queue.
pub struct DispatchQueue {
    robot_kind: RobotKind,
    slots: Arc<Mutex<Slots>>,
    job_tx: mpsc::Sender<Job>,
    command_id: AtomicU64,
    worker: JoinHandle<()>,
}

impl DispatchQueue {
    /// Spawn the worker that owns `commander`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(commander: Box<dyn Commander>) -> Self {
        let robot_kind = commander.kind();
        let slots = Arc::new(Mutex::new(Slots::default()));

        // Room for the job about to execute plus the pending one
        let (job_tx, job_rx) = mpsc::channel(motion::QUEUE_CAPACITY + 1);

        let worker = Worker::new(commander, job_rx, slots.clone());
        let worker = tokio::spawn(worker.run());

        info!("Dispatch queue started for {} robot", robot_kind);

        Self {
            robot_kind,
            slots,
            job_tx,
            command_id: AtomicU64::new(0),
            worker,
        }
    }

    pub fn robot_kind(&self) -> RobotKind {
        self.robot_kind
    }

    fn next_command_id(&self) -> u64 {
        self.command_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Submit a command for execution
    ///
    /// Returns immediately. Cancel commands are applied directly and yield an
    /// already resolved ticket.
    pub fn submit(&self, command: Command) -> Result<Ticket, DispatchError> {
        let kind = command.kind();

        if kind == CommandKind::CancelGesture {
            return Ok(self.cancel_immediately());
        }

        let mut slots = self.slots.lock();

        let admission = match slots.fsm.process_event(DispatchEvent::Submitted) {
            TransitionResult::Admitted(admission) => admission,
            _ => {
                debug!("Rejecting {}: queue is full", kind);
                return Err(DispatchError::QueueFull);
            }
        };

        let command_id = self.next_command_id();
        let cancel = Arc::new(CancelSignal::default());
        let entry = SlotEntry {
            command_id,
            kind,
            cancel: cancel.clone(),
        };
        match admission {
            Admission::Queued => slots.pending = Some(entry),
            Admission::Running | Admission::Immediate => slots.active = Some(entry),
        }

        let (reply, result_rx) = oneshot::channel();
        let job = Job {
            command_id,
            command,
            cancel,
            reply,
        };

        if let Err(e) = self.job_tx.try_send(job) {
            slots.withdraw(admission);
            return Err(match e {
                TrySendError::Full(_) => DispatchError::QueueFull,
                TrySendError::Closed(_) => DispatchError::WorkerStopped,
            });
        }
        drop(slots);

        info!("Command {} ({}) accepted: {:?}", command_id, kind, admission);

        Ok(Ticket {
            command_id,
            kind,
            admission,
            result_rx,
        })
    }

    /// Cancel the executing gesture, if there is one
    ///
    /// Never blocks and never queues. A no-op when nothing is executing or
    /// when the executing command is a plain movement.
    pub fn cancel_gesture(&self) -> CancelReply {
        let slots = self.slots.lock();

        match &slots.active {
            Some(entry) if entry.kind.is_gesture() => {
                info!("Cancelling gesture (command {})", entry.command_id);
                entry.cancel.cancel();
            }
            Some(entry) => {
                debug!(
                    "Cancel ignored: command {} ({}) runs to completion",
                    entry.command_id, entry.kind
                );
            }
            None => {
                debug!("Cancel ignored: nothing is executing");
            }
        }

        CancelReply { ok: true }
    }

    fn cancel_immediately(&self) -> Ticket {
        let command_id = self.next_command_id();
        self.cancel_gesture();

        let (reply, result_rx) = oneshot::channel();
        let _ = reply.send(Ok(CommandReport {
            command_id,
            kind: CommandKind::CancelGesture,
            outcome: CommandOutcome::Completed,
            elapsed: Duration::ZERO,
        }));

        Ticket {
            command_id,
            kind: CommandKind::CancelGesture,
            admission: Admission::Immediate,
            result_rx,
        }
    }

    /// Consistent snapshot of the commander state
    pub fn status(&self) -> CommanderState {
        let slots = self.slots.lock();
        CommanderState {
            robot_kind: self.robot_kind,
            busy: slots.fsm.is_busy(),
        }
    }

    /// Number of commands waiting in the pending slot
    pub fn queued(&self) -> usize {
        self.slots.lock().fsm.queued()
    }

    /// Stop accepting work and wait for the worker to drain
    pub async fn shutdown(self) {
        let Self { job_tx, worker, .. } = self;
        drop(job_tx);
        if let Err(e) = worker.await {
            error!("Dispatch worker ended abnormally: {}", e);
        }
    }
}
