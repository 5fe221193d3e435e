//! Physical robot commander
//!
//! Translates commander operations into locomotion driver calls. Movements
//! set a body velocity, hold it for the fixed duration and stop. The wave
//! gesture opens the hand, holds and closes it.

use super::{Commander, CommanderError, HandAction, LocoDriver};
use async_trait::async_trait;
use booster_shared::{CommanderState, Direction, RobotKind};
use std::time::Duration;
use tracing::{debug, warn};

/// Commander backed by the real robot
pub struct PhysicalCommander<D: LocoDriver> {
    driver: D,
    busy: bool,
}

impl<D: LocoDriver> PhysicalCommander<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            busy: false,
        }
    }

    async fn drive(&self, direction: Direction) -> Result<(), CommanderError> {
        let (vx, vy, vyaw) = direction.velocity();
        debug!("[T1] Moving {:?}: vx={} vy={} vyaw={}", direction, vx, vy, vyaw);

        if let Err(e) = self.driver.move_robot(vx, vy, vyaw).await {
            self.stop_after_fault().await;
            return Err(e.into());
        }

        tokio::time::sleep(direction.duration()).await;

        debug!("[T1] Stopping after {:?}", direction);
        self.driver.move_robot(0.0, 0.0, 0.0).await?;
        Ok(())
    }

    async fn wave(&self, duration: Duration) -> Result<(), CommanderError> {
        debug!("[T1] Waving hand for {:?}", duration);
        self.driver.wave_hand(HandAction::Open).await?;

        tokio::time::sleep(duration).await;

        self.driver.wave_hand(HandAction::Close).await?;
        debug!("[T1] Waved hand");
        Ok(())
    }

    /// Best-effort stop after a failed motion request
    async fn stop_after_fault(&self) {
        if let Err(e) = self.driver.move_robot(0.0, 0.0, 0.0).await {
            warn!("[T1] Stop after fault failed: {}", e);
        }
    }
}

#[async_trait]
impl<D: LocoDriver> Commander for PhysicalCommander<D> {
    fn kind(&self) -> RobotKind {
        RobotKind::Physical
    }

    fn status(&self) -> CommanderState {
        CommanderState {
            robot_kind: RobotKind::Physical,
            busy: self.busy,
        }
    }

    async fn move_robot(&mut self, direction: Direction) -> Result<(), CommanderError> {
        self.busy = true;
        let result = self.drive(direction).await;
        self.busy = false;
        result
    }

    async fn wave_gesture(&mut self, duration: Duration) -> Result<(), CommanderError> {
        self.busy = true;
        let result = self.wave(duration).await;
        self.busy = false;
        result
    }

    // A dropped wave leaves `busy` set until this runs
    async fn cancel_gesture(&mut self) -> Result<(), CommanderError> {
        debug!("[T1] Cancelling wave");
        self.busy = false;
        self.driver.wave_hand(HandAction::Close).await?;
        Ok(())
    }
}
