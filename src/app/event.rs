use std::process::ExitStatus;

use tokio::task::JoinHandle;

use crate::core::{BuiltCommand, LabAction, LabOptions};
use crate::host::command_runner::CommandError;
use crate::host::RunHandle;

/// Orchestrator lifecycle actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeAction {
    Up,
    Down,
    Restart,
    Logs,
}

impl ComposeAction {
    /// Arguments appended to the compose program
    pub fn args(&self) -> &'static str {
        match self {
            ComposeAction::Up => "up -d",
            ComposeAction::Down => "down",
            ComposeAction::Restart => "restart",
            ComposeAction::Logs => "logs -f",
        }
    }

    /// Streamed actions report output; the rest run detached
    pub fn streams_output(&self) -> bool {
        matches!(self, ComposeAction::Restart | ComposeAction::Logs)
    }

    pub fn needs_confirmation(&self) -> bool {
        matches!(self, ComposeAction::Down | ComposeAction::Restart)
    }
}

/// Everything the presentation layer can ask for
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Assemble a lab command for review
    Generate { action: LabAction, options: LabOptions },
    /// Run a reviewed command line
    Execute { command: String },
    /// Switching to live trading needs `confirmed`
    SetDryRun { enabled: bool, confirmed: bool },
    SaveProxyPort { port: String },
    Compose { action: ComposeAction, confirmed: bool },
    OpenFrequi,
    OpenRoot,
}

/// Result of dispatching one [`AppCommand`]
#[derive(Debug)]
pub enum Outcome {
    Generated(BuiltCommand),
    /// A streamed run is under way
    Started(RunHandle),
    /// A fire-and-forget command was sent; `task` resolves to its exit status
    Dispatched {
        command: String,
        task: JoinHandle<Result<ExitStatus, CommandError>>,
    },
    Saved { message: String },
    /// Input did not qualify; nothing happened
    Ignored,
    /// A safety gate stopped the request
    Rejected { reason: String },
    Failed { reason: String },
    Opened { target: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_actions() {
        assert_eq!(ComposeAction::Up.args(), "up -d");
        assert!(!ComposeAction::Up.streams_output());
        assert!(!ComposeAction::Up.needs_confirmation());
        assert!(ComposeAction::Logs.streams_output());
        assert!(ComposeAction::Down.needs_confirmation());
        assert!(ComposeAction::Restart.needs_confirmation());
    }
}
