//! Host module for process management and orchestrator status

pub mod command_runner;
pub mod status;

pub use command_runner::{CommandRunner, RunHandle};
pub use status::{poll_once, ComposeProbe, StatusPoller, StatusProbe};
