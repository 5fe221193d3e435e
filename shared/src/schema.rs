//! Request and response bodies for the HTTP façade

use crate::{CommandParams, DispatchError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /command`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

impl CommandRequest {
    /// Extract the numeric parameters the dispatch core understands
    ///
    /// Unknown keys are ignored. A `duration` that is present but not a
    /// number is rejected.
    pub fn params(&self) -> Result<CommandParams, DispatchError> {
        let Some(parameters) = &self.parameters else {
            return Ok(CommandParams::default());
        };

        let duration = match parameters.get("duration") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(other) => {
                return Err(DispatchError::InvalidParameter(format!(
                    "duration must be a number, got {}",
                    other
                )));
            }
        };

        Ok(CommandParams { duration })
    }
}

/// Body returned by `POST /command`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::failed_with(message, None)
    }

    /// A failure that still carries a structured body
    pub fn failed_with(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }
}

/// Result of a submission as relayed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReply {
    pub accepted: bool,
    pub queued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<u64>,
}

impl SubmitReply {
    pub fn rejected() -> Self {
        Self {
            accepted: false,
            queued: false,
            command_id: None,
        }
    }
}

/// Result of a cancel request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReply {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_parameters() {
        let request: CommandRequest = serde_json::from_value(json!({"command": "move-forward"})).unwrap();
        assert_eq!(request.command, "move-forward");
        assert_eq!(request.params().unwrap(), CommandParams::default());
    }

    #[test]
    fn test_request_duration() {
        let request: CommandRequest = serde_json::from_value(json!({
            "command": "wave-hand",
            "parameters": {"duration": 2, "ignored": "x"}
        }))
        .unwrap();
        assert_eq!(request.params().unwrap().duration, Some(2.0));
    }

    #[test]
    fn test_request_bad_duration() {
        let request: CommandRequest = serde_json::from_value(json!({
            "command": "wave-hand",
            "parameters": {"duration": "long"}
        }))
        .unwrap();
        assert!(matches!(
            request.params(),
            Err(DispatchError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_submit_reply_shape() {
        let reply = SubmitReply {
            accepted: true,
            queued: false,
            command_id: Some(7),
        };
        let json = serde_json::to_value(reply).unwrap();
        assert_eq!(json, json!({"accepted": true, "queued": false, "command_id": 7}));

        let json = serde_json::to_value(SubmitReply::rejected()).unwrap();
        assert_eq!(json, json!({"accepted": false, "queued": false}));
    }

    #[test]
    fn test_failed_response_shape() {
        let json = serde_json::to_value(CommandResponse::failed("nope")).unwrap();
        assert_eq!(json, json!({"success": false, "message": "nope", "data": null}));

        let rejected = serde_json::to_value(SubmitReply::rejected()).ok();
        let json = serde_json::to_value(CommandResponse::failed_with("busy", rejected)).unwrap();
        assert_eq!(json["data"], json!({"accepted": false, "queued": false}));
    }
}
