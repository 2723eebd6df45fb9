//! Command-line interface
//!
//! The terminal plays the role of a control window: it dispatches
//! [`AppCommand`](crate::app::AppCommand)s and drains streamed runs on its
//! own turn.

pub mod config;
pub mod control;
pub mod lab;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::app::Outcome;
use crate::host::RunHandle;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    /// The bot configuration file does not exist
    pub const CONFIG_MISSING: i32 = 2;
    /// A safety gate refused the request
    pub const REJECTED: i32 = 3;
}

#[derive(Debug, Parser)]
#[command(
    name = "ftdesk",
    version,
    about = "Control desk for a docker-compose freqtrade deployment"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Deployment root (contains docker-compose.yml and user_data/)
    #[arg(long, global = true, env = "FTDESK_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a download-data command
    Download(lab::LabArgs),
    /// Build a backtesting command
    Backtest(lab::LabArgs),
    /// Build a hyperopt command
    Hyperopt(lab::LabArgs),
    /// Execute a reviewed command line and stream its output
    Run(control::RunArgs),
    /// Show whether any compose service is running
    Status(control::StatusArgs),
    /// Start the bot (`compose up -d`)
    Up,
    /// Stop the bot (`compose down`)
    Down(ConfirmArgs),
    /// Restart the bot to apply configuration changes
    Restart(ConfirmArgs),
    /// Follow the bot logs
    Logs,
    /// Switch between dry-run and live trading
    DryRun(config::DryRunArgs),
    /// Show or set the exchange proxy port
    Proxy(config::ProxyArgs),
    /// Read the bot configuration
    Config(config::ConfigArgs),
    /// List remembered pair strings
    Pairs,
    /// List strategies and config files
    Files,
    /// Open FreqUI in the browser
    Ui,
    /// Open the deployment folder
    Open,
}

#[derive(Debug, Args)]
pub struct ConfirmArgs {
    /// Skip the confirmation gate
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// A safety gate or input check stopped the command
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Rejected(pub String);

/// Map a non-streaming outcome to terminal output
pub fn report(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Generated(built) => println!("{}", built.text),
        Outcome::Saved { message } => println!("{}", message),
        Outcome::Dispatched { command, .. } => {
            anyhow::bail!("'{}' must be awaited, not reported", command)
        }
        Outcome::Opened { target } => println!("Opened {}", target),
        Outcome::Ignored => tracing::debug!("Input ignored"),
        Outcome::Rejected { reason } => return Err(Rejected(reason).into()),
        Outcome::Failed { reason } => anyhow::bail!(reason),
        Outcome::Started(handle) => {
            anyhow::bail!("run {} must be streamed, not reported", handle.id)
        }
    }
    Ok(())
}

/// Print a run's lines as they arrive
pub async fn stream(handle: RunHandle) {
    tracing::debug!(id = %handle.id, command = %handle.command, "Streaming run");
    handle.drain(|line| println!("{}", line)).await;
}

/// Stream a run, wait for a detached command, report anything else
pub async fn finish(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Started(handle) => {
            stream(handle).await;
            Ok(())
        }
        Outcome::Dispatched { command, task } => {
            let status = task.await??;
            if !status.success() {
                anyhow::bail!("'{}' exited with {}", command, status);
            }
            println!("Sent: {}", command);
            Ok(())
        }
        other => report(other),
    }
}
