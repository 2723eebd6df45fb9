//! Orchestrator status polling
//!
//! A background task asks the orchestrator which services are running every
//! few seconds and publishes a plain on/off flag. Failures read as "off".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::command_runner::{CommandError, CommandRunner};

#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("Status query failed: {0}")]
    Command(#[from] CommandError),

    #[error("Orchestrator binary '{0}' not found in PATH")]
    BinaryNotFound(String),
}

/// Answers "is any service running right now?"
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn is_running(&self) -> Result<bool, ProbeError>;
}

/// Probe backed by `<compose> ps --services --filter "status=running"`
pub struct ComposeProbe {
    runner: CommandRunner,
    command: String,
}

impl ComposeProbe {
    pub fn new(runner: CommandRunner, compose_program: &str) -> Self {
        Self {
            runner,
            command: format!("{} ps --services --filter \"status=running\"", compose_program),
        }
    }

    #[cfg(test)]
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl StatusProbe for ComposeProbe {
    async fn is_running(&self) -> Result<bool, ProbeError> {
        let binary = self.command.split_whitespace().next().unwrap_or_default();
        if which::which(binary).is_err() {
            return Err(ProbeError::BinaryNotFound(binary.to_string()));
        }

        let stdout = self.runner.capture(&self.command).await?;
        Ok(!stdout.trim().is_empty())
    }
}

/// One poll cycle; any failure counts as not running
pub async fn poll_once(probe: &dyn StatusProbe) -> bool {
    match probe.is_running().await {
        Ok(running) => running,
        Err(e) => {
            tracing::debug!("Treating status as off: {}", e);
            false
        }
    }
}

/// Periodic status publisher.
///
/// Once started it runs until the returned task is aborted or the runtime
/// shuts down.
pub struct StatusPoller {
    probe: Arc<dyn StatusProbe>,
    interval: Duration,
    tx: watch::Sender<bool>,
}

impl StatusPoller {
    pub fn new(probe: Arc<dyn StatusProbe>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { probe, interval, tx }
    }

    /// Receive status changes; starts out as `false`
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn start(self) -> JoinHandle<()> {
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "Starting status poller");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let running = poll_once(self.probe.as_ref()).await;
                // Subscribers are only woken when the flag flips
                self.tx.send_if_modified(|current| {
                    let flipped = *current != running;
                    *current = running;
                    flipped
                });
            }
        })
    }
}
