//! Lab commands: download / backtest / hyperopt
//!
//! Prints the assembled command for review. `--run` executes exactly the
//! printed text afterwards.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;

use crate::app::{App, AppCommand, Outcome};
use crate::core::{HyperoptSpace, LabAction, LabOptions, LossFunction, TradingMode};
use crate::core::{DEFAULT_EPOCHS, DEFAULT_TIMEFRAMES};
use crate::store::Catalog;

#[derive(Debug, Clone, Args)]
pub struct LabArgs {
    /// Strategy class (defaults to the first one found)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Config file in user_data (defaults to back.json when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Last N days; ignored unless a positive integer
    #[arg(short, long)]
    pub days: Option<String>,

    /// Range start (YYYY-MM-DD), used when --days is not given
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Range end (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Pairs to force instead of the config whitelist
    #[arg(short, long, num_args = 1..)]
    pub pairs: Vec<String>,

    /// Timeframes for download-data
    #[arg(short, long, default_value = DEFAULT_TIMEFRAMES)]
    pub timeframes: String,

    /// Spot instead of futures
    #[arg(long)]
    pub spot: bool,

    /// Skip `--export trades` on backtests
    #[arg(long)]
    pub no_export: bool,

    /// Hyperopt loss (sharpe, sortino, calmar, profitdrawdown, onlyprofit)
    #[arg(short, long, value_parser = parse_loss, default_value = "sharpe")]
    pub loss: LossFunction,

    /// Hyperopt spaces (buy, sell, roi, stoploss, trailing)
    #[arg(long, value_parser = parse_space, value_delimiter = ',', num_args = 1..)]
    pub spaces: Vec<HyperoptSpace>,

    /// Hyperopt epochs
    #[arg(short, long, default_value = DEFAULT_EPOCHS)]
    pub epochs: String,

    /// Execute the command after printing it
    #[arg(long)]
    pub run: bool,
}

fn parse_loss(value: &str) -> Result<LossFunction, String> {
    LossFunction::from_name(value).ok_or_else(|| {
        let known: Vec<_> = LossFunction::ALL
            .iter()
            .map(|l| format!("  {}: {}", l.class_name(), l.description()))
            .collect();
        format!("unknown loss '{}', expected one of:\n{}", value, known.join("\n"))
    })
}

fn parse_space(value: &str) -> Result<HyperoptSpace, String> {
    HyperoptSpace::from_flag(value).ok_or_else(|| format!("unknown space '{}'", value))
}

impl LabArgs {
    /// Fill the option payload, taking defaults from the scanned catalog
    pub fn to_options(&self, action: LabAction, catalog: &Catalog) -> anyhow::Result<LabOptions> {
        let defaults = LabOptions::default();

        let strategy = match (&self.strategy, catalog.strategies.first()) {
            (Some(strategy), _) => strategy.clone(),
            (None, Some(first)) => first.clone(),
            (None, None) if action == LabAction::Download => String::new(),
            (None, None) => anyhow::bail!("No strategies found; pass --strategy"),
        };

        let config_file = self
            .config
            .clone()
            .or_else(|| catalog.preferred_config.clone())
            .context("No config files found in user_data; pass --config")?;

        let end = self.end.unwrap_or(defaults.end);
        let start = self.start.unwrap_or(end - chrono::Duration::days(30));

        let spaces = if self.spaces.is_empty() {
            defaults.spaces
        } else {
            self.spaces.iter().copied().collect()
        };

        Ok(LabOptions {
            strategy,
            config_file,
            days: self.days.clone().unwrap_or_default(),
            start,
            end,
            pairs: self.pairs.join(" "),
            timeframes: self.timeframes.clone(),
            trading_mode: if self.spot {
                TradingMode::Spot
            } else {
                TradingMode::Futures
            },
            export_trades: !self.no_export,
            loss: self.loss,
            spaces,
            epochs: self.epochs.clone(),
        })
    }
}

pub async fn run(app: &mut App, action: LabAction, args: LabArgs) -> anyhow::Result<()> {
    let catalog = app.catalog();
    let options = args.to_options(action, &catalog)?;

    let built = match app.dispatch(AppCommand::Generate { action, options }) {
        Outcome::Generated(built) => built,
        other => return super::report(other),
    };
    println!("{}", built.text);

    if !args.run {
        return Ok(());
    }

    let outcome = app.dispatch(AppCommand::Execute {
        command: built.text,
    });
    super::finish(outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> LabArgs {
        let mut argv = vec!["ftdesk"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Backtest(args)) | Some(Commands::Hyperopt(args)) | Some(Commands::Download(args)) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            strategies: vec!["AlphaBreakout".to_string(), "ZetaTrend".to_string()],
            configs: vec!["back.json".to_string()],
            preferred_config: Some("back.json".to_string()),
        }
    }

    #[test]
    fn test_defaults_come_from_catalog() {
        let args = parse(&["backtest", "--days", "30"]);
        let opts = args.to_options(LabAction::Backtest, &catalog()).unwrap();
        assert_eq!(opts.strategy, "AlphaBreakout");
        assert_eq!(opts.config_file, "back.json");
        assert_eq!(opts.days, "30");
        assert!(opts.export_trades);
        assert_eq!(opts.trading_mode, TradingMode::Futures);
        assert!(!args.run);
    }

    #[test]
    fn test_hyperopt_flags() {
        let args = parse(&[
            "hyperopt",
            "-s",
            "ZetaTrend",
            "--loss",
            "calmar",
            "--spaces",
            "stoploss,roi",
            "--pairs",
            "BTC/USDC:USDC",
            "ETH/USDC:USDC",
            "--start",
            "2024-01-01",
            "--end",
            "2024-02-01",
        ]);
        let opts = args.to_options(LabAction::Hyperopt, &catalog()).unwrap();
        assert_eq!(opts.strategy, "ZetaTrend");
        assert_eq!(opts.loss, LossFunction::Calmar);
        let spaces: Vec<_> = opts.spaces.iter().map(|s| s.as_flag()).collect();
        assert_eq!(spaces, vec!["roi", "stoploss"]);
        assert_eq!(opts.pairs, "BTC/USDC:USDC ETH/USDC:USDC");
        assert_eq!(opts.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(opts.end, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_unknown_loss_is_rejected_by_parser() {
        let argv = ["ftdesk", "hyperopt", "--loss", "MaxDrawDown"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_missing_strategy() {
        let empty = Catalog {
            preferred_config: Some("config.json".to_string()),
            ..Catalog::default()
        };
        let args = parse(&["download", "--spot"]);
        let opts = args.to_options(LabAction::Download, &empty).unwrap();
        assert_eq!(opts.strategy, "");
        assert_eq!(opts.trading_mode, TradingMode::Spot);

        let args = parse(&["backtest"]);
        assert!(args.to_options(LabAction::Backtest, &empty).is_err());
    }
}
