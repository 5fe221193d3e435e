//! Simulated commander
//!
//! Sleeps for the requested duration and records what a real robot would
//! have done.

use super::{Commander, CommanderError};
use async_trait::async_trait;
use booster_shared::{CommanderState, Direction, RobotKind};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Something the simulated robot was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    MoveStarted(Direction),
    MoveFinished(Direction),
    WaveStarted(Duration),
    WaveFinished,
    WaveCancelled,
}

impl Intent {
    /// True for intents that begin an action
    pub fn is_start(&self) -> bool {
        matches!(self, Intent::MoveStarted(_) | Intent::WaveStarted(_))
    }
}

/// Shared, append-only record of intents
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<Intent>>>,
}

impl Journal {
    fn record(&self, intent: Intent) {
        self.entries.lock().push(intent);
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<Intent> {
        self.entries.lock().clone()
    }
}

/// Commander backend that never touches hardware
#[derive(Debug, Default)]
pub struct MockCommander {
    journal: Journal,
    busy: bool,
}

impl MockCommander {
    pub fn new() -> Self {
        debug!("Initializing mock robot commander");
        Self::default()
    }

    /// Handle to the intents this commander records
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

#[async_trait]
impl Commander for MockCommander {
    fn kind(&self) -> RobotKind {
        RobotKind::Simulated
    }

    fn status(&self) -> CommanderState {
        CommanderState {
            robot_kind: RobotKind::Simulated,
            busy: self.busy,
        }
    }

    async fn move_robot(&mut self, direction: Direction) -> Result<(), CommanderError> {
        let (vx, vy, vyaw) = direction.velocity();
        debug!(
            "[MOCK] Moving {:?}: vx={} vy={} vyaw={}",
            direction, vx, vy, vyaw
        );
        self.journal.record(Intent::MoveStarted(direction));
        self.busy = true;

        tokio::time::sleep(direction.duration()).await;

        self.busy = false;
        self.journal.record(Intent::MoveFinished(direction));
        debug!("[MOCK] Moved {:?}", direction);
        Ok(())
    }

    async fn wave_gesture(&mut self, duration: Duration) -> Result<(), CommanderError> {
        debug!("[MOCK] Waving hand for {:?}", duration);
        self.journal.record(Intent::WaveStarted(duration));
        self.busy = true;

        tokio::time::sleep(duration).await;

        self.busy = false;
        self.journal.record(Intent::WaveFinished);
        debug!("[MOCK] Waved hand");
        Ok(())
    }

    async fn cancel_gesture(&mut self) -> Result<(), CommanderError> {
        debug!("[MOCK] Cancelling wave");
        self.busy = false;
        self.journal.record(Intent::WaveCancelled);
        Ok(())
    }
}
