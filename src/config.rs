//! Server configuration
//!
//! Read once from the environment at startup and passed by value into the
//! components that need it.

use crate::commander::DriverConfig;
use anyhow::{anyhow, Context, Result};
use booster_shared::RobotKind;
use std::time::Duration;

/// Value of `ROBOT` that selects the physical robot
pub const PHYSICAL_ROBOT_SELECTOR: &str = "booster-t1";

/// Configuration for the command server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP façade listens on
    pub bind_address: String,
    /// Which commander backend to run
    pub robot: RobotKind,
    /// Driver settings, only used with the physical robot
    pub driver: DriverConfig,
    /// Log at debug level by default
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".into(),
            robot: RobotKind::Simulated,
            driver: DriverConfig::default(),
            verbose: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, starting from the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if lookup("ROBOT").as_deref() == Some(PHYSICAL_ROBOT_SELECTOR) {
            config.robot = RobotKind::Physical;
        }

        if let Some(bind) = lookup("BOOSTER_BIND") {
            config.bind_address = bind;
        }

        if let Some(address) = lookup("BOOSTER_ROBOT_ADDR") {
            config.driver.address = address;
        }

        if let Some(raw) = lookup("BOOSTER_DRIVER_TIMEOUT_MS") {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("BOOSTER_DRIVER_TIMEOUT_MS is not a number: {:?}", raw))?;
            if ms == 0 {
                return Err(anyhow!("BOOSTER_DRIVER_TIMEOUT_MS must be greater than zero"));
            }
            config.driver.reply_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup("BOOSTER_VERBOSE") {
            config.verbose = parse_flag(&raw)
                .ok_or_else(|| anyhow!("BOOSTER_VERBOSE is not a boolean: {:?}", raw))?;
        }

        Ok(config)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
