//! Request handlers for the command API

use super::AppState;
use axum::extract::State;
use axum::Json;
use booster_shared::schema::{CommandRequest, CommandResponse, SubmitReply};
use booster_shared::{Command, CommandKind, CommanderState, DispatchError};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Root endpoint
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Booster Platform API",
        "endpoints": {
            "/command": "POST - Execute commands",
            "/status": "GET - Robot status",
            "/health": "GET - Health check",
        },
    }))
}

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Current commander state
pub async fn status(State(state): State<AppState>) -> Json<CommanderState> {
    Json(state.queue.status())
}

/// Execute a command based on the request
pub async fn execute_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Json<CommandResponse> {
    debug!("POST /command: {}", request.command);

    match request.command.as_str() {
        "ping" => {
            let echo = Value::Object(request.parameters.clone().unwrap_or_default());
            return Json(CommandResponse::ok("Pong!", Some(json!({ "echo": echo }))));
        }
        "status" => {
            let status = serde_json::to_value(state.queue.status()).ok();
            return Json(CommandResponse::ok("Robot status", status));
        }
        _ => {}
    }

    let kind = match request.command.parse::<CommandKind>() {
        Ok(kind) => kind,
        Err(e) => return Json(CommandResponse::failed(e.to_string())),
    };

    if kind == CommandKind::CancelGesture {
        let reply = state.queue.cancel_gesture();
        return Json(CommandResponse::ok(
            "Cancelled waved hand",
            serde_json::to_value(reply).ok(),
        ));
    }

    let command = match request
        .params()
        .and_then(|params| Command::new(kind, params))
    {
        Ok(command) => command,
        Err(e) => {
            warn!("Rejected {}: {}", kind, e);
            return Json(CommandResponse::failed(e.to_string()));
        }
    };

    match state.queue.submit(command) {
        Ok(ticket) => {
            let reply = ticket.reply();
            let message = if reply.queued {
                format!("{} (queued)", action_message(ticket.kind()))
            } else {
                action_message(ticket.kind()).to_string()
            };
            info!("Command {} dispatched: {}", ticket.command_id(), message);
            debug!("Commands waiting: {}", state.queue.queued());
            Json(CommandResponse::ok(message, serde_json::to_value(reply).ok()))
        }
        Err(DispatchError::QueueFull) => Json(CommandResponse::failed_with(
            "Robot is busy and the command queue is full, try again later",
            serde_json::to_value(SubmitReply::rejected()).ok(),
        )),
        Err(e) => Json(CommandResponse::failed(e.to_string())),
    }
}

fn action_message(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::MoveForward => "Moving forward",
        CommandKind::MoveBackward => "Moving backward",
        CommandKind::TurnLeft => "Turning left",
        CommandKind::TurnRight => "Turning right",
        CommandKind::WaveGesture => "Waving hand",
        CommandKind::CancelGesture => "Cancelled waved hand",
    }
}
