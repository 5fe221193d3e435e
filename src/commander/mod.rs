//! Robot commander backends
//!
//! A [`Commander`] is the capability the dispatch worker drives. Two backends
//! exist:
//! - [`MockCommander`] logs and records intents without touching hardware
//! - [`PhysicalCommander`] drives the robot through a [`LocoDriver`]
//!
//! The backend is chosen once at startup and handed to the dispatch queue.

mod driver;
mod mock;
mod physical;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{DriverConfig, DriverError, HandAction, LocoDriver, UdpLocoDriver};
pub use mock::{Intent, Journal, MockCommander};
pub use physical::PhysicalCommander;

use crate::config::ServerConfig;
use anyhow::Context;
use async_trait::async_trait;
use booster_shared::{CommanderState, Direction, RobotKind};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors raised by a commander backend
#[derive(Error, Debug)]
pub enum CommanderError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// A robot that can be commanded
///
/// Timed operations return once the action has finished. The dispatch queue
/// guarantees at most one caller at a time, so implementations do not guard
/// against overlapping calls.
#[async_trait]
pub trait Commander: Send {
    /// Which kind of robot this is
    fn kind(&self) -> RobotKind;

    /// Current state, readable at any time without waiting
    fn status(&self) -> CommanderState;

    /// Drive in `direction` at the fixed speed for the fixed duration, then stop
    async fn move_robot(&mut self, direction: Direction) -> Result<(), CommanderError>;

    /// Wave for `duration`
    async fn wave_gesture(&mut self, duration: Duration) -> Result<(), CommanderError>;

    /// Stop any gesture in progress. Safe to call when nothing is running.
    async fn cancel_gesture(&mut self) -> Result<(), CommanderError>;
}

/// Build the commander selected by the configuration
pub async fn connect(config: &ServerConfig) -> anyhow::Result<Box<dyn Commander>> {
    match config.robot {
        RobotKind::Simulated => {
            info!("Using mock robot commander");
            Ok(Box::new(MockCommander::new()))
        }
        RobotKind::Physical => {
            info!(
                "Using booster-t1 robot commander (driver at {})",
                config.driver.address
            );
            let driver = UdpLocoDriver::connect(config.driver.clone())
                .await
                .with_context(|| {
                    format!("Failed to open robot driver at {}", config.driver.address)
                })?;
            Ok(Box::new(PhysicalCommander::new(driver)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_simulated() {
        let config = ServerConfig::default();
        let commander = connect(&config).await.unwrap();
        assert_eq!(commander.kind(), RobotKind::Simulated);
        assert!(!commander.status().busy);
    }

    #[tokio::test]
    async fn test_connect_physical() {
        let mut config = ServerConfig::default();
        config.robot = RobotKind::Physical;
        config.driver.address = "127.0.0.1:7400".into();

        // UDP has no handshake, so opening the driver succeeds without a robot
        let commander = connect(&config).await.unwrap();
        assert_eq!(commander.kind(), RobotKind::Physical);
    }
}
