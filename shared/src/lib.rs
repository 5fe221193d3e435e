//! Booster Shared Types
//!
//! This crate provides the command model, the commander state snapshot, the
//! HTTP schema types and the busy/cancel state machine shared by the
//! dispatch core and the HTTP façade.

pub mod schema;
pub mod state_machine;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Motion parameters for the robot
///
/// Callers can only pick a direction; speeds and durations are fixed here.
pub mod motion {
    /// Forward speed in m/s
    pub const FORWARD_SPEED_MPS: f32 = 0.5;

    /// Backward speed in m/s
    pub const BACKWARD_SPEED_MPS: f32 = 0.2;

    /// Rotation speed in rad/s
    pub const TURN_RATE_RADPS: f32 = 0.2;

    /// How long a single movement command drives the robot
    pub const MOVE_DURATION_MS: u64 = 1000;

    /// Gesture duration used when the caller does not provide one
    pub const DEFAULT_GESTURE_DURATION_MS: u64 = 1000;

    /// Number of commands that may wait behind the executing one
    pub const QUEUE_CAPACITY: usize = 1;
}

/// Which kind of robot backs the commander
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotKind {
    /// Simulated robot, nothing is actuated
    Simulated,
    /// Physical Booster T1 robot
    Physical,
}

impl RobotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotKind::Simulated => "simulated",
            RobotKind::Physical => "physical",
        }
    }
}

impl fmt::Display for RobotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a plain movement command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    /// Body velocity `(vx, vy, vyaw)` for this direction
    pub fn velocity(&self) -> (f32, f32, f32) {
        match self {
            Direction::Forward => (motion::FORWARD_SPEED_MPS, 0.0, 0.0),
            Direction::Backward => (-motion::BACKWARD_SPEED_MPS, 0.0, 0.0),
            Direction::Left => (0.0, 0.0, motion::TURN_RATE_RADPS),
            Direction::Right => (0.0, 0.0, -motion::TURN_RATE_RADPS),
        }
    }

    /// How long a movement in this direction lasts
    pub fn duration(&self) -> Duration {
        Duration::from_millis(motion::MOVE_DURATION_MS)
    }
}

/// Kind of operation a command asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    WaveGesture,
    CancelGesture,
}

impl CommandKind {
    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::MoveForward => "move-forward",
            CommandKind::MoveBackward => "move-backward",
            CommandKind::TurnLeft => "turn-left",
            CommandKind::TurnRight => "turn-right",
            CommandKind::WaveGesture => "wave-hand",
            CommandKind::CancelGesture => "cancel-wave-hand",
        }
    }

    /// Direction for plain movement commands, `None` for gestures
    pub fn direction(&self) -> Option<Direction> {
        match self {
            CommandKind::MoveForward => Some(Direction::Forward),
            CommandKind::MoveBackward => Some(Direction::Backward),
            CommandKind::TurnLeft => Some(Direction::Left),
            CommandKind::TurnRight => Some(Direction::Right),
            CommandKind::WaveGesture | CommandKind::CancelGesture => None,
        }
    }

    pub fn is_gesture(&self) -> bool {
        matches!(self, CommandKind::WaveGesture)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move-forward" => Ok(CommandKind::MoveForward),
            "move-backward" => Ok(CommandKind::MoveBackward),
            "turn-left" => Ok(CommandKind::TurnLeft),
            "turn-right" => Ok(CommandKind::TurnRight),
            "wave-hand" | "wave-gesture" => Ok(CommandKind::WaveGesture),
            "cancel-wave-hand" | "cancel-gesture" => Ok(CommandKind::CancelGesture),
            other => Err(DispatchError::UnknownCommand(other.to_string())),
        }
    }
}

/// Optional numeric parameters attached to a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandParams {
    /// Gesture duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl CommandParams {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
        }
    }
}

/// A validated, immutable robot command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    gesture_duration: Duration,
}

impl Command {
    /// Create a command, rejecting invalid parameters
    ///
    /// The gesture duration must be a positive number of seconds that fits a
    /// [`Duration`]. Parameters are ignored for every other kind.
    pub fn new(kind: CommandKind, params: CommandParams) -> Result<Self, DispatchError> {
        let mut gesture_duration = default_gesture_duration();

        if kind.is_gesture() {
            if let Some(seconds) = params.duration {
                gesture_duration = Duration::try_from_secs_f64(seconds)
                    .ok()
                    .filter(|d| !d.is_zero())
                    .ok_or_else(|| {
                        DispatchError::InvalidParameter(format!(
                            "duration must be a positive number of seconds, got {}",
                            seconds
                        ))
                    })?;
            }
        }

        Ok(Self {
            kind,
            gesture_duration,
        })
    }

    /// A wave gesture with the default duration
    pub fn wave() -> Self {
        Self {
            kind: CommandKind::WaveGesture,
            gesture_duration: default_gesture_duration(),
        }
    }

    /// A plain movement in `direction`
    pub fn motion(direction: Direction) -> Self {
        let kind = match direction {
            Direction::Forward => CommandKind::MoveForward,
            Direction::Backward => CommandKind::MoveBackward,
            Direction::Left => CommandKind::TurnLeft,
            Direction::Right => CommandKind::TurnRight,
        };
        Self {
            kind,
            gesture_duration: default_gesture_duration(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Validated gesture duration, the default when none was given
    pub fn gesture_duration(&self) -> Duration {
        self.gesture_duration
    }
}

fn default_gesture_duration() -> Duration {
    Duration::from_millis(motion::DEFAULT_GESTURE_DURATION_MS)
}

/// Snapshot of the commander as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommanderState {
    pub robot_kind: RobotKind,
    pub busy: bool,
}

/// How an accepted submission was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Admission {
    /// The command started executing right away
    Running,
    /// The command waits in the pending slot
    Queued,
    /// The command was applied directly without entering the queue
    Immediate,
}

impl Admission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Admission::Queued)
    }
}

/// Errors surfaced by the dispatch core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Command queue is full, robot is busy")]
    QueueFull,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Backend fault during command {command_id}: {message}")]
    BackendFault { command_id: u64, message: String },

    #[error("Dispatch worker stopped")]
    WorkerStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_kind_names() {
        assert_eq!("move-forward".parse::<CommandKind>(), Ok(CommandKind::MoveForward));
        assert_eq!("wave-hand".parse::<CommandKind>(), Ok(CommandKind::WaveGesture));
        assert_eq!(
            "cancel-wave-hand".parse::<CommandKind>(),
            Ok(CommandKind::CancelGesture)
        );
        assert_eq!(CommandKind::TurnRight.to_string(), "turn-right");
        assert!(matches!(
            "jump".parse::<CommandKind>(),
            Err(DispatchError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_gesture_duration_default() {
        let cmd = Command::new(CommandKind::WaveGesture, CommandParams::default()).unwrap();
        assert_eq!(cmd.gesture_duration(), Duration::from_secs(1));

        let cmd = Command::new(CommandKind::WaveGesture, CommandParams::with_duration(2.5)).unwrap();
        assert_eq!(cmd.gesture_duration(), Duration::from_millis(2500));
    }

    #[test]
    fn test_invalid_gesture_duration() {
        for bad in [0.0, -1.0, 1e-12, 1e300, f64::MAX, f64::NAN, f64::INFINITY] {
            let result = Command::new(CommandKind::WaveGesture, CommandParams::with_duration(bad));
            assert!(matches!(result, Err(DispatchError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_motion_ignores_duration() {
        let cmd = Command::new(CommandKind::MoveForward, CommandParams::with_duration(-3.0));
        assert!(cmd.is_ok());
    }

    #[test]
    fn test_direction_velocity() {
        assert_eq!(Direction::Forward.velocity(), (0.5, 0.0, 0.0));
        assert_eq!(Direction::Backward.velocity(), (-0.2, 0.0, 0.0));
        assert_eq!(Direction::Left.velocity(), (0.0, 0.0, 0.2));
        assert_eq!(Direction::Right.velocity(), (0.0, 0.0, -0.2));
        assert_eq!(Direction::Left.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_state_serialization() {
        let state = CommanderState {
            robot_kind: RobotKind::Simulated,
            busy: true,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["robot_kind"], "simulated");
        assert_eq!(json["busy"], true);
    }
}
