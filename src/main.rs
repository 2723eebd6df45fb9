//! ftdesk - control desk for a docker-compose freqtrade deployment
//!
//! - Assembles download / backtest / hyperopt command lines for review
//! - Streams long-running commands line by line
//! - Polls the compose project for a running bot
//! - Edits dry-run and proxy settings in the bot configuration

mod app;
mod cli;
mod core;
mod host;
mod logging;
mod settings;
mod store;

use clap::Parser;

use app::{App, AppCommand, AppError, ComposeAction};
use cli::{exit_codes, Cli, Commands};
use crate::core::LabAction;
use settings::AppConfig;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.json_output) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    let config = AppConfig::load(cli.root.as_deref());
    tracing::debug!(root = %config.paths.root.display(), "Resolved deployment root");

    let mut app = App::new(config);
    if let Err(e) = app.check_environment() {
        eprintln!("Error: {}", e);
        return exit_codes::CONFIG_MISSING;
    }

    let command = cli.command;
    let result = rt.block_on(async {
        match command {
            Some(Commands::Download(args)) => cli::lab::run(&mut app, LabAction::Download, args).await,
            Some(Commands::Backtest(args)) => cli::lab::run(&mut app, LabAction::Backtest, args).await,
            Some(Commands::Hyperopt(args)) => cli::lab::run(&mut app, LabAction::Hyperopt, args).await,
            Some(Commands::Run(args)) => cli::control::run(&mut app, args).await,
            Some(Commands::Status(args)) => cli::control::status(&app, args).await,
            Some(Commands::Up) => cli::control::compose(&mut app, ComposeAction::Up, true).await,
            Some(Commands::Down(args)) => {
                cli::control::compose(&mut app, ComposeAction::Down, args.yes).await
            }
            Some(Commands::Restart(args)) => {
                cli::control::compose(&mut app, ComposeAction::Restart, args.yes).await
            }
            Some(Commands::Logs) => cli::control::compose(&mut app, ComposeAction::Logs, true).await,
            Some(Commands::DryRun(args)) => cli::config::dry_run(&mut app, args),
            Some(Commands::Proxy(args)) => cli::config::proxy(&mut app, args),
            Some(Commands::Config(args)) => cli::config::run(&app, args),
            Some(Commands::Pairs) => {
                cli::config::pairs(&app);
                Ok(())
            }
            Some(Commands::Files) => {
                cli::config::files(&app);
                Ok(())
            }
            Some(Commands::Ui) => cli::control::open(&mut app, AppCommand::OpenFrequi),
            Some(Commands::Open) => cli::control::open(&mut app, AppCommand::OpenRoot),
            None => overview(&app).await,
        }
    });

    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            categorize_error(&e)
        }
    }
}

/// Default view: where we are and what state the bot is in
async fn overview(app: &App) -> anyhow::Result<()> {
    let store = app.config_store();
    let running = host::poll_once(app.status_probe().as_ref()).await;

    println!("Root:    {}", app.config().paths.root.display());
    println!("Mode:    {}", if store.dry_run() { "dry-run" } else { "LIVE" });
    println!(
        "Proxy:   {}",
        store.proxy_port().unwrap_or_else(|| "none".to_string())
    );
    println!("Status:  {}", cli::control::status_label(running));
    Ok(())
}

/// Categorize an error into the appropriate exit code
fn categorize_error(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<cli::Rejected>().is_some() {
        exit_codes::REJECTED
    } else if let Some(AppError::ConfigMissing(_)) = e.downcast_ref::<AppError>() {
        exit_codes::CONFIG_MISSING
    } else {
        exit_codes::UNEXPECTED_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_categorize_error() {
        let rejected: anyhow::Error = cli::Rejected("confirm".to_string()).into();
        assert_eq!(categorize_error(&rejected), exit_codes::REJECTED);

        let missing: anyhow::Error = AppError::ConfigMissing(PathBuf::from("config.json")).into();
        assert_eq!(categorize_error(&missing), exit_codes::CONFIG_MISSING);

        assert_eq!(
            categorize_error(&anyhow::anyhow!("boom")),
            exit_codes::UNEXPECTED_FAILURE
        );
    }
}
