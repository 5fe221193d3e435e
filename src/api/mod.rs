//! HTTP façade
//!
//! Translates requests into dispatch queue calls and relays the results.
//! It owns no robot state of its own.

mod handlers;

use crate::dispatch::DispatchQueue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<DispatchQueue>,
}

/// Build the router serving the command API
pub fn router(queue: Arc<DispatchQueue>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/command", post(handlers::execute_command))
        .with_state(AppState { queue })
}
