//! Application dispatcher
//!
//! Owns the stores and the runner and turns each [`AppCommand`] into an
//! [`Outcome`]. Config and history files are only touched from here, on the
//! caller's thread; background tasks never see them.

pub mod event;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub use event::{AppCommand, ComposeAction, Outcome};

use crate::core::{CommandBuilder, LabAction, LabOptions};
use crate::host::{CommandRunner, ComposeProbe, StatusPoller, StatusProbe};
use crate::settings::AppConfig;
use crate::store::{Catalog, ConfigStore, PairHistory, ProxySave};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Could not open {target}: {reason}")]
    Open { target: String, reason: String },
}

pub struct App {
    config: AppConfig,
    store: ConfigStore,
    history: PairHistory,
    builder: CommandBuilder,
    runner: CommandRunner,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let store = ConfigStore::new(&config.paths.config);
        let history = PairHistory::load(&config.paths.pair_history);
        let builder = CommandBuilder::new(config.settings.run_prefix());
        let runner = CommandRunner::new(&config.paths.root).with_env("COMPOSE_ANSI", "never");

        Self {
            config,
            store,
            history,
            builder,
            runner,
        }
    }

    /// Replace the command builder (e.g. one with a pinned date)
    #[cfg(test)]
    pub fn with_builder(mut self, builder: CommandBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn history(&self) -> &PairHistory {
        &self.history
    }

    /// The one hard startup failure: the bot configuration must exist
    pub fn check_environment(&self) -> Result<(), AppError> {
        if !self.store.exists() {
            return Err(AppError::ConfigMissing(self.store.path().to_path_buf()));
        }

        let program = &self.config.settings.compose.program;
        let binary = program.split_whitespace().next().unwrap_or(program);
        if which::which(binary).is_err() {
            tracing::warn!("'{}' is not in PATH; orchestrator commands will fail", binary);
        }
        Ok(())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::scan(&self.config.paths, &self.config.settings.lab.default_config)
    }

    pub fn status_probe(&self) -> Arc<dyn StatusProbe> {
        Arc::new(ComposeProbe::new(
            self.runner.clone(),
            &self.config.settings.compose.program,
        ))
    }

    /// Status poller wired to the compose project; call `start` to run it
    pub fn status_poller(&self) -> StatusPoller {
        StatusPoller::new(self.status_probe(), self.config.settings.poll_interval())
    }

    /// Handle one command
    pub fn dispatch(&mut self, command: AppCommand) -> Outcome {
        match command {
            AppCommand::Generate { action, options } => self.generate(action, &options),
            AppCommand::Execute { command } => self.execute(&command),
            AppCommand::SetDryRun { enabled, confirmed } => self.set_dry_run(enabled, confirmed),
            AppCommand::SaveProxyPort { port } => self.save_proxy_port(&port),
            AppCommand::Compose { action, confirmed } => self.compose(action, confirmed),
            AppCommand::OpenFrequi => {
                let url = self.config.settings.frequi.url.clone();
                open_target(url)
            }
            AppCommand::OpenRoot => {
                let root = self.config.paths.root.display().to_string();
                open_target(root)
            }
        }
    }

    fn generate(&mut self, action: LabAction, options: &LabOptions) -> Outcome {
        let built = self.builder.build(action, options);
        if let Some(pairs) = &built.pairs {
            if self.history.record(pairs) {
                tracing::debug!("Remembered pairs {:?}", pairs);
            }
        }
        Outcome::Generated(built)
    }

    fn execute(&self, command: &str) -> Outcome {
        let command = command.trim();
        if command.is_empty() {
            return Outcome::Rejected {
                reason: "Preview is empty, generate a command first".to_string(),
            };
        }
        Outcome::Started(self.runner.spawn(command))
    }

    fn set_dry_run(&self, enabled: bool, confirmed: bool) -> Outcome {
        if !enabled && !confirmed {
            return Outcome::Rejected {
                reason: "Switching to live trading puts real funds at risk; confirm to continue"
                    .to_string(),
            };
        }

        if !self.store.set_dry_run(enabled) {
            return Outcome::Failed {
                reason: format!("Could not update {}", self.store.path().display()),
            };
        }

        let mode = if enabled { "dry-run" } else { "live" };
        Outcome::Saved {
            message: format!("Switched to {} mode, restart the bot to apply", mode),
        }
    }

    fn save_proxy_port(&self, port: &str) -> Outcome {
        match self.store.set_proxy_port(port) {
            ProxySave::Saved { url } => Outcome::Saved {
                message: format!("Proxy set to {}, restart the bot to apply", url),
            },
            ProxySave::Ignored => Outcome::Ignored,
            ProxySave::Failed(reason) => Outcome::Failed { reason },
        }
    }

    fn compose(&self, action: ComposeAction, confirmed: bool) -> Outcome {
        if action.needs_confirmation() && !confirmed {
            return Outcome::Rejected {
                reason: format!("'{}' needs confirmation", action.args()),
            };
        }

        let command = format!("{} {}", self.config.settings.compose.program, action.args());
        if action.streams_output() {
            Outcome::Started(self.runner.spawn(command))
        } else {
            let task = self.runner.run_detached(&command);
            Outcome::Dispatched { command, task }
        }
    }
}

fn open_target(target: String) -> Outcome {
    match open::that(&target) {
        Ok(()) => Outcome::Opened { target },
        Err(e) => {
            let err = AppError::Open {
                target,
                reason: e.to_string(),
            };
            tracing::warn!("{}", err);
            Outcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HyperoptSpace;
    use crate::settings::{AppPaths, Settings};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn app_with_config(config: &str) -> (TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());
        std::fs::create_dir_all(&paths.user_data).unwrap();
        std::fs::write(&paths.config, config).unwrap();

        let config = AppConfig {
            paths,
            settings: Settings::default(),
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let app = App::new(config.clone())
            .with_builder(CommandBuilder::new(config.settings.run_prefix()).with_today(today));
        (dir, app)
    }

    fn persisted(app: &App) -> Value {
        let text = std::fs::read_to_string(app.config_store().path()).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn options(pairs: &str) -> LabOptions {
        LabOptions {
            strategy: "SampleStrategy".to_string(),
            config_file: "back.json".to_string(),
            pairs: pairs.to_string(),
            ..LabOptions::default()
        }
    }

    #[test]
    fn test_missing_config_is_fatal() {
        let (dir, app) = app_with_config("{}");
        assert!(app.check_environment().is_ok());

        std::fs::remove_file(AppPaths::new(dir.path()).config).unwrap();
        let err = app.check_environment().unwrap_err();
        assert!(matches!(err, AppError::ConfigMissing(_)));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_generate_records_pair_once() {
        let (dir, mut app) = app_with_config("{}");

        for _ in 0..2 {
            let outcome = app.dispatch(AppCommand::Generate {
                action: LabAction::Backtest,
                options: options("BTC/USDC:USDC"),
            });
            match outcome {
                Outcome::Generated(built) => {
                    assert!(built.text.contains("--pairs BTC/USDC:USDC"))
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        let reopened = PairHistory::load(AppPaths::new(dir.path()).pair_history);
        assert_eq!(reopened.entries(), &["BTC/USDC:USDC"]);
        assert_eq!(app.history().entries().len(), 1);
    }

    #[test]
    fn test_generate_without_pairs_leaves_history_alone() {
        let (dir, mut app) = app_with_config("{}");
        let mut opts = options("   ");
        opts.spaces = [HyperoptSpace::Roi, HyperoptSpace::Stoploss].into_iter().collect();

        let outcome = app.dispatch(AppCommand::Generate {
            action: LabAction::Hyperopt,
            options: opts,
        });
        match outcome {
            Outcome::Generated(built) => {
                assert!(built.text.contains("--spaces roi stoploss"));
                assert!(!built.text.contains("--pairs"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!AppPaths::new(dir.path()).pair_history.exists());
    }

    #[test]
    fn test_live_mode_needs_confirmation() {
        let (_dir, mut app) = app_with_config(r#"{"dry_run": true, "extra": 1}"#);

        let outcome = app.dispatch(AppCommand::SetDryRun {
            enabled: false,
            confirmed: false,
        });
        assert!(matches!(outcome, Outcome::Rejected { .. }));
        assert_eq!(persisted(&app)["dry_run"], json!(true));

        let outcome = app.dispatch(AppCommand::SetDryRun {
            enabled: false,
            confirmed: true,
        });
        assert!(matches!(outcome, Outcome::Saved { .. }));
        assert_eq!(persisted(&app)["dry_run"], json!(false));
        assert_eq!(persisted(&app)["extra"], json!(1));

        // Back to dry-run never asks
        let outcome = app.dispatch(AppCommand::SetDryRun {
            enabled: true,
            confirmed: false,
        });
        assert!(matches!(outcome, Outcome::Saved { .. }));
        assert!(app.config_store().dry_run());
    }

    #[test]
    fn test_proxy_port_outcomes() {
        let (_dir, mut app) = app_with_config(r#"{"dry_run": true}"#);

        let outcome = app.dispatch(AppCommand::SaveProxyPort {
            port: "abc".to_string(),
        });
        assert!(matches!(outcome, Outcome::Ignored));
        assert!(persisted(&app).get("exchange").is_none());

        let outcome = app.dispatch(AppCommand::SaveProxyPort {
            port: "7890".to_string(),
        });
        assert!(matches!(outcome, Outcome::Saved { .. }));
        assert_eq!(app.config_store().proxy_port().as_deref(), Some("7890"));
    }

    #[test]
    fn test_empty_execute_and_unconfirmed_down_are_rejected() {
        let (_dir, mut app) = app_with_config("{}");

        let outcome = app.dispatch(AppCommand::Execute {
            command: "  \n".to_string(),
        });
        assert!(matches!(outcome, Outcome::Rejected { .. }));

        let outcome = app.dispatch(AppCommand::Compose {
            action: ComposeAction::Down,
            confirmed: false,
        });
        assert!(matches!(outcome, Outcome::Rejected { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_streams_until_finished() {
        let (_dir, mut app) = app_with_config("{}");

        let lines = tokio_test::block_on(async move {
            let handle = match app.dispatch(AppCommand::Execute {
                command: "echo hello from lab".to_string(),
            }) {
                Outcome::Started(handle) => handle,
                other => panic!("unexpected outcome {:?}", other),
            };

            let mut lines = Vec::new();
            handle.drain(|line| lines.push(line.to_string())).await;
            lines
        });

        assert!(lines.iter().any(|l| l == "hello from lab"));
        assert!(lines.last().unwrap().ends_with("Task finished"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compose_up_hands_back_detached_task() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path());
        std::fs::create_dir_all(&paths.user_data).unwrap();
        std::fs::write(&paths.config, "{}").unwrap();
        let mut settings = Settings::default();
        settings.compose.program = "echo".to_string();
        let mut app = App::new(AppConfig { paths, settings });

        match app.dispatch(AppCommand::Compose {
            action: ComposeAction::Up,
            confirmed: false,
        }) {
            Outcome::Dispatched { command, task } => {
                assert_eq!(command, "echo up -d");
                assert!(task.await.unwrap().unwrap().success());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poller_starts_off() {
        let (_dir, app) = app_with_config("{}");
        let poller = app.status_poller();
        let rx = poller.subscribe();
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_catalog_uses_default_config() {
        let (dir, app) = app_with_config("{}");
        std::fs::write(AppPaths::new(dir.path()).user_data.join("back.json"), "{}").unwrap();

        let catalog = app.catalog();
        assert_eq!(catalog.configs, vec!["back.json", "config.json"]);
        assert_eq!(catalog.preferred_config.as_deref(), Some("back.json"));
        assert!(catalog.strategies.is_empty());
    }
}
