//! Bot configuration commands and `user_data` listings

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::app::{App, AppCommand};

use super::Toggle;

#[derive(Debug, Args)]
pub struct DryRunArgs {
    /// `on` for simulated trading, `off` for live trading
    #[arg(value_enum)]
    pub mode: Toggle,

    /// Confirm switching to live trading
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ProxyArgs {
    /// New proxy port; omit to show the current one
    pub port: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print one top-level key as JSON
    Get(ConfigGetArgs),
}

#[derive(Debug, Args)]
pub struct ConfigGetArgs {
    /// Top-level key, e.g. `dry_run` or `exchange`
    pub key: String,
}

pub fn dry_run(app: &mut App, args: DryRunArgs) -> anyhow::Result<()> {
    let outcome = app.dispatch(AppCommand::SetDryRun {
        enabled: args.mode == Toggle::On,
        confirmed: args.yes,
    });
    super::report(outcome)
}

pub fn proxy(app: &mut App, args: ProxyArgs) -> anyhow::Result<()> {
    let Some(port) = args.port else {
        match app.config_store().proxy_port() {
            Some(port) => println!("{}", port),
            None => println!("No proxy configured"),
        }
        return Ok(());
    };

    let outcome = app.dispatch(AppCommand::SaveProxyPort { port: port.clone() });
    if matches!(outcome, crate::app::Outcome::Ignored) {
        return Err(super::Rejected(format!("'{}' is not a port number", port)).into());
    }
    super::report(outcome)
}

pub fn run(app: &App, args: ConfigArgs) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Get(args) => get(app, args),
    }
}

pub fn get(app: &App, args: ConfigGetArgs) -> anyhow::Result<()> {
    let value = app.config_store().get(&args.key, Value::Null);
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub fn pairs(app: &App) {
    let entries = app.history().entries();
    if entries.is_empty() {
        println!("No pairs remembered yet");
    }
    for entry in entries {
        println!("{}", entry);
    }
}

pub fn files(app: &App) {
    let catalog = app.catalog();

    println!("Strategies:");
    if catalog.strategies.is_empty() {
        println!("  (no strategies found)");
    }
    for strategy in &catalog.strategies {
        println!("  {}", strategy);
    }

    println!("Configs:");
    for config in &catalog.configs {
        let marker = if catalog.preferred_config.as_ref() == Some(config) {
            " *"
        } else {
            ""
        };
        println!("  {}{}", config, marker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands, Rejected};
    use crate::settings::{AppConfig, AppPaths, Settings};
    use clap::Parser;

    fn app_with_config(config: &str) -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());
        std::fs::create_dir_all(&paths.user_data).unwrap();
        std::fs::write(&paths.config, config).unwrap();
        let app = App::new(AppConfig {
            paths,
            settings: Settings::default(),
        });
        (dir, app)
    }

    #[test]
    fn test_parse_dry_run() {
        let cli = Cli::try_parse_from(["ftdesk", "dry-run", "off", "--yes"]).unwrap();
        match cli.command {
            Some(Commands::DryRun(args)) => {
                assert_eq!(args.mode, Toggle::Off);
                assert!(args.yes);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["ftdesk", "dry-run", "maybe"]).is_err());
    }

    #[test]
    fn test_live_mode_without_yes_is_rejected() {
        let (_dir, mut app) = app_with_config(r#"{"dry_run": true}"#);
        let err = dry_run(
            &mut app,
            DryRunArgs {
                mode: Toggle::Off,
                yes: false,
            },
        )
        .unwrap_err();
        assert!(err.downcast_ref::<Rejected>().is_some());
        assert!(app.config_store().dry_run());
    }

    #[test]
    fn test_proxy_rejects_garbage_and_saves_port() {
        let (_dir, mut app) = app_with_config("{}");

        let err = proxy(
            &mut app,
            ProxyArgs {
                port: Some("80a".to_string()),
            },
        )
        .unwrap_err();
        assert!(err.downcast_ref::<Rejected>().is_some());

        proxy(
            &mut app,
            ProxyArgs {
                port: Some("1080".to_string()),
            },
        )
        .unwrap();
        assert_eq!(app.config_store().proxy_port().as_deref(), Some("1080"));
        assert!(proxy(&mut app, ProxyArgs { port: None }).is_ok());
    }

    #[test]
    fn test_parse_config_get() {
        let cli = Cli::try_parse_from(["ftdesk", "config", "get", "dry_run"]).unwrap();
        match cli.command {
            Some(Commands::Config(ConfigArgs {
                action: ConfigAction::Get(args),
            })) => assert_eq!(args.key, "dry_run"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_get_missing_key_is_null() {
        let (_dir, app) = app_with_config(r#"{"stake_currency": "USDC"}"#);
        assert!(get(
            &app,
            ConfigGetArgs {
                key: "nope".to_string()
            }
        )
        .is_ok());
    }
}
