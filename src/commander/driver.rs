//! Locomotion driver for the physical robot
//!
//! The robot's locomotion client runs in a bridge process next to the motor
//! controllers. Each request is one JSON datagram:
//! ```text
//! {"seq": 7, "op": "move", "vx": 0.5, "vy": 0.0, "vyaw": 0.0}
//! {"seq": 8, "op": "wave_hand", "action": "open"}
//! ```
//! and the bridge answers with `{"seq": 7, "code": 0, "message": ""}`.
//! A non-zero code means the robot refused or failed the request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Maximum size of a reply datagram
const MAX_REPLY_SIZE: usize = 1024;

/// Hand pose for the wave gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandAction {
    Open,
    Close,
}

/// Errors reported by the locomotion driver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Driver I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reply from robot within {0:?}")]
    Timeout(Duration),

    #[error("Robot rejected request (code {code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("Malformed driver message: {0}")]
    Protocol(#[from] serde_json::Error),
}

/// Low-level locomotion capability of the physical robot
#[async_trait]
pub trait LocoDriver: Send + Sync {
    /// Set the body velocity. All zeros stops the robot.
    async fn move_robot(&self, vx: f32, vy: f32, vyaw: f32) -> Result<(), DriverError>;

    /// Open or close the waving hand
    async fn wave_hand(&self, action: HandAction) -> Result<(), DriverError>;
}

/// Configuration for the driver connection
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// UDP address of the locomotion bridge
    pub address: String,
    /// How long to wait for each reply
    pub reply_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7400".into(),
            reply_timeout: Duration::from_millis(500),
        }
    }
}

/// Request body sent to the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LocoRequest {
    Move { vx: f32, vy: f32, vyaw: f32 },
    WaveHand { action: HandAction },
}

/// Request datagram with its sequence number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocoFrame {
    pub seq: u64,
    #[serde(flatten)]
    pub request: LocoRequest,
}

/// Reply datagram from the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocoReply {
    pub seq: u64,
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// [`LocoDriver`] speaking JSON datagrams to the locomotion bridge
pub struct UdpLocoDriver {
    socket: UdpSocket,
    config: DriverConfig,
    sequence_id: AtomicU64,
}

impl UdpLocoDriver {
    /// Open a socket towards the bridge
    pub async fn connect(config: DriverConfig) -> Result<Self, DriverError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.address).await?;
        debug!("[DRIVER] Socket ready for {}", config.address);

        Ok(Self {
            socket,
            config,
            sequence_id: AtomicU64::new(0),
        })
    }

    fn next_sequence_id(&self) -> u64 {
        self.sequence_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Send one request and wait for the matching reply
    async fn request(&self, request: LocoRequest) -> Result<(), DriverError> {
        let seq = self.next_sequence_id();
        let payload = serde_json::to_vec(&LocoFrame { seq, request })?;
        self.socket.send(&payload).await?;

        let reply = timeout(self.config.reply_timeout, self.await_reply(seq))
            .await
            .map_err(|_| DriverError::Timeout(self.config.reply_timeout))??;

        if reply.code != 0 {
            return Err(DriverError::Rejected {
                code: reply.code,
                message: reply.message,
            });
        }

        Ok(())
    }

    async fn await_reply(&self, seq: u64) -> Result<LocoReply, DriverError> {
        let mut buf = [0u8; MAX_REPLY_SIZE];

        loop {
            let n = self.socket.recv(&mut buf).await?;
            let reply: LocoReply = serde_json::from_slice(&buf[..n])?;

            if reply.seq == seq {
                return Ok(reply);
            }

            // Late reply to a request that already timed out
            warn!("[DRIVER] Dropping stale reply seq={} (want {})", reply.seq, seq);
        }
    }
}

#[async_trait]
impl LocoDriver for UdpLocoDriver {
    async fn move_robot(&self, vx: f32, vy: f32, vyaw: f32) -> Result<(), DriverError> {
        self.request(LocoRequest::Move { vx, vy, vyaw }).await
    }

    async fn wave_hand(&self, action: HandAction) -> Result<(), DriverError> {
        self.request(LocoRequest::WaveHand { action }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bind a fake bridge and a driver pointed at it
    async fn bridge_pair() -> (UdpSocket, UdpLocoDriver) {
        let bridge = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = DriverConfig {
            address: bridge.local_addr().unwrap().to_string(),
            reply_timeout: Duration::from_millis(200),
        };
        let driver = UdpLocoDriver::connect(config).await.unwrap();
        (bridge, driver)
    }

    /// Answer one request with `code`, returning the decoded frame
    async fn answer(bridge: &UdpSocket, code: i32) -> LocoFrame {
        let mut buf = [0u8; MAX_REPLY_SIZE];
        let (n, peer) = bridge.recv_from(&mut buf).await.unwrap();
        let frame: LocoFrame = serde_json::from_slice(&buf[..n]).unwrap();

        let reply = LocoReply {
            seq: frame.seq,
            code,
            message: if code == 0 { String::new() } else { "motor fault".into() },
        };
        bridge
            .send_to(&serde_json::to_vec(&reply).unwrap(), peer)
            .await
            .unwrap();
        frame
    }

    #[test]
    fn test_frame_format() {
        let frame = LocoFrame {
            seq: 3,
            request: LocoRequest::WaveHand {
                action: HandAction::Open,
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["op"], "wave_hand");
        assert_eq!(json["action"], "open");
    }

    #[tokio::test]
    async fn test_move_request_round_trip() {
        let (bridge, driver) = bridge_pair().await;

        let (result, frame) = tokio::join!(driver.move_robot(0.5, 0.0, 0.0), answer(&bridge, 0));
        assert!(result.is_ok());
        assert_eq!(
            frame.request,
            LocoRequest::Move {
                vx: 0.5,
                vy: 0.0,
                vyaw: 0.0
            }
        );
        assert_eq!(frame.seq, 1);
    }

    #[tokio::test]
    async fn test_non_zero_code_is_rejection() {
        let (bridge, driver) = bridge_pair().await;

        let (result, _) = tokio::join!(driver.wave_hand(HandAction::Open), answer(&bridge, 3));
        match result {
            Err(DriverError::Rejected { code, message }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "motor fault");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_bridge_times_out() {
        let (_bridge, driver) = bridge_pair().await;

        let result = driver.move_robot(0.0, 0.0, 0.0).await;
        assert!(matches!(result, Err(DriverError::Timeout(_))));
    }
}
