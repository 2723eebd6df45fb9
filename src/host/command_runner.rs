//! Command Runner
//!
//! Executes reviewed shell command lines in the application root.
//! Output from stdout and stderr is merged and streamed line by line over a
//! bounded channel; the consumer drains it whenever it gets a turn.
//! Every streamed run ends with exactly one [`RunEvent::Finished`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

/// Buffered events per run before the child's reader waits on the consumer
pub const CHANNEL_CAPACITY: usize = 256;

const RULE_WIDTH: usize = 40;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Something the consumer of a run should render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// One line of banner or merged process output
    Line(String),
    /// The run is over, whatever the outcome
    Finished,
}

/// Command runner errors
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("Failed to launch process: {0}")]
    LaunchFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Consumer side of a streamed run
#[derive(Debug)]
pub struct RunHandle {
    pub id: Uuid,
    pub command: String,
    events: mpsc::Receiver<RunEvent>,
}

impl RunHandle {
    /// Wait for the next event. `None` once the run has been fully drained.
    pub async fn next(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Feed every line to `on_line` until the run finishes
    pub async fn drain(mut self, mut on_line: impl FnMut(&str)) {
        while let Some(event) = self.next().await {
            match event {
                RunEvent::Line(line) => on_line(&line),
                RunEvent::Finished => break,
            }
        }
    }
}

/// Command runner for the orchestrator CLI
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Every child starts here
    working_directory: PathBuf,
    /// Environment variables to add
    env_additions: HashMap<String, String>,
}

impl CommandRunner {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            env_additions: HashMap::new(),
        }
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_additions.insert(key.into(), value.into());
        self
    }

    /// Build a shell invocation of `command`
    fn shell_command(&self, command: &str) -> Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd.creation_flags(CREATE_NO_WINDOW);
            cmd
        };

        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        };

        cmd.current_dir(&self.working_directory);
        cmd.envs(&self.env_additions);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Start a streamed run on a background task.
    ///
    /// Sends the start banner, each output line as it arrives, the end banner
    /// and finally [`RunEvent::Finished`]. Launch or read failures become a
    /// single `Error:` line, still followed by `Finished`.
    pub fn spawn(&self, command: impl Into<String>) -> RunHandle {
        let command = command.into();
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cmd = self.shell_command(&command);
        let banner = start_banner(&command);

        let span = tracing::info_span!("run", %id);
        tokio::spawn(
            async move {
                tracing::info!("Starting streamed run");
                let _ = tx.send(RunEvent::Line(banner)).await;

                match stream_output(cmd, &tx).await {
                    Ok(status) => {
                        tracing::debug!(code = ?status.code(), "Process exited");
                        let _ = tx.send(RunEvent::Line(end_banner())).await;
                    }
                    Err(e) => {
                        tracing::warn!("Run failed: {}", e);
                        let _ = tx.send(RunEvent::Line(format!("Error: {}", e))).await;
                    }
                }

                let _ = tx.send(RunEvent::Finished).await;
                tracing::info!("Run finished");
            }
            .instrument(span),
        );

        RunHandle {
            id,
            command,
            events: rx,
        }
    }

    /// Fire-and-forget run whose output is discarded; only the exit status is logged
    pub fn run_detached(&self, command: &str) -> JoinHandle<Result<ExitStatus, CommandError>> {
        let mut cmd = self.shell_command(command);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let command = command.to_string();

        tokio::spawn(async move {
            let status = cmd
                .status()
                .await
                .map_err(|e| CommandError::LaunchFailed(e.to_string()));
            match &status {
                Ok(status) => tracing::info!(%command, code = ?status.code(), "Detached command exited"),
                Err(e) => tracing::warn!(%command, "Detached command failed: {}", e),
            }
            status
        })
    }

    /// Run to completion and return stdout (lossily decoded)
    pub async fn capture(&self, command: &str) -> Result<String, CommandError> {
        let output = self
            .shell_command(command)
            .output()
            .await
            .map_err(|e| CommandError::LaunchFailed(e.to_string()))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn start_banner(command: &str) -> String {
    format!("Running command:\n{}\n{}", command, "=".repeat(RULE_WIDTH))
}

fn end_banner() -> String {
    format!("{}\nTask finished", "=".repeat(RULE_WIDTH))
}

async fn stream_output(
    mut cmd: Command,
    tx: &mpsc::Sender<RunEvent>,
) -> Result<ExitStatus, CommandError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .map_err(|e| CommandError::LaunchFailed(e.to_string()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CommandError::IoError("Failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CommandError::IoError("Failed to capture stderr".to_string()))?;

    let (out, err) = tokio::join!(forward_lines(stdout, tx), forward_lines(stderr, tx));
    out?;
    err?;

    child
        .wait()
        .await
        .map_err(|e| CommandError::IoError(e.to_string()))
}

/// Forward one stream line by line. Invalid UTF-8 is replaced, not rejected.
async fn forward_lines<R: AsyncRead + Unpin>(
    stream: R,
    tx: &mpsc::Sender<RunEvent>,
) -> Result<(), CommandError> {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut listening = true;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| CommandError::IoError(e.to_string()))?;
        if read == 0 {
            return Ok(());
        }

        // Keep reading after the consumer leaves so the child never blocks on a full pipe
        if listening {
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            listening = tx.send(RunEvent::Line(line)).await.is_ok();
        }
    }
}
