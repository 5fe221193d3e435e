//! Test doubles for the locomotion driver

use super::{DriverError, HandAction, LocoDriver};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// A call received by [`ScriptedDriver`]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Move(f32, f32, f32),
    Hand(HandAction),
}

/// Shared record of driver calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<DriverCall>>>,
}

impl CallLog {
    pub fn snapshot(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }
}

type FaultRule = Box<dyn Fn(&DriverCall) -> bool + Send + Sync>;

/// Driver that records calls and fails the ones matching a rule
pub struct ScriptedDriver {
    log: CallLog,
    fault: Option<FaultRule>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            fault: None,
        }
    }

    /// Fail every call for which `rule` returns true
    pub fn fail_on(mut self, rule: impl Fn(&DriverCall) -> bool + Send + Sync + 'static) -> Self {
        self.fault = Some(Box::new(rule));
        self
    }

    /// Fail every velocity request
    pub fn fail_moves(self) -> Self {
        self.fail_on(|call| matches!(call, DriverCall::Move(..)))
    }

    pub fn calls(&self) -> CallLog {
        self.log.clone()
    }

    fn handle(&self, call: DriverCall) -> Result<(), DriverError> {
        let failed = self.fault.as_ref().is_some_and(|rule| rule(&call));
        self.log.calls.lock().push(call);

        if failed {
            return Err(DriverError::Rejected {
                code: -1,
                message: "injected fault".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl LocoDriver for ScriptedDriver {
    async fn move_robot(&self, vx: f32, vy: f32, vyaw: f32) -> Result<(), DriverError> {
        self.handle(DriverCall::Move(vx, vy, vyaw))
    }

    async fn wave_hand(&self, action: HandAction) -> Result<(), DriverError> {
        self.handle(DriverCall::Hand(action))
    }
}
