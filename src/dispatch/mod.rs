//! Command dispatch for the robot
//!
//! This module handles:
//! - Admitting commands into the single pending slot
//! - Executing them one at a time on a dedicated worker task
//! - Cancelling a running gesture outside the queue
//! - Reporting each command's terminal outcome to its submitter

mod cancel;
mod queue;
mod worker;

pub use queue::DispatchQueue;
