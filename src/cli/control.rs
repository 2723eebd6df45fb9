//! Bot lifecycle and status commands

use chrono::Local;
use clap::Args;

use crate::app::{App, AppCommand, ComposeAction};
use crate::host::poll_once;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Command line to execute, passed to the shell as one string
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1.., required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Keep polling and print every change
    #[arg(short, long)]
    pub watch: bool,
}

pub fn status_label(running: bool) -> &'static str {
    if running {
        "Running"
    } else {
        "Stopped"
    }
}

pub async fn run(app: &mut App, args: RunArgs) -> anyhow::Result<()> {
    let outcome = app.dispatch(AppCommand::Execute {
        command: args.command.join(" "),
    });
    super::finish(outcome).await
}

pub async fn status(app: &App, args: StatusArgs) -> anyhow::Result<()> {
    if !args.watch {
        let running = poll_once(app.status_probe().as_ref()).await;
        println!("{}", status_label(running));
        return Ok(());
    }

    let poller = app.status_poller();
    let mut rx = poller.subscribe();
    let task = poller.start();

    println!("{} {}", Local::now().format("%H:%M:%S"), status_label(*rx.borrow()));
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let running = *rx.borrow_and_update();
                println!("{} {}", Local::now().format("%H:%M:%S"), status_label(running));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted, stopping status watch");
                break;
            }
        }
    }

    task.abort();
    Ok(())
}

pub async fn compose(app: &mut App, action: ComposeAction, confirmed: bool) -> anyhow::Result<()> {
    let outcome = app.dispatch(AppCommand::Compose { action, confirmed });
    super::finish(outcome).await
}

pub fn open(app: &mut App, command: AppCommand) -> anyhow::Result<()> {
    super::report(app.dispatch(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_run_keeps_hyphenated_arguments() {
        let cli = Cli::try_parse_from([
            "ftdesk",
            "run",
            "docker",
            "compose",
            "run",
            "--rm",
            "freqtrade",
            "list-strategies",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run(args)) => assert_eq!(
                args.command.join(" "),
                "docker compose run --rm freqtrade list-strategies"
            ),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_a_command() {
        assert!(Cli::try_parse_from(["ftdesk", "run"]).is_err());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(true), "Running");
        assert_eq!(status_label(false), "Stopped");

        let cli = Cli::try_parse_from(["ftdesk", "status", "--watch"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Status(StatusArgs { watch: true }))));
    }
}
