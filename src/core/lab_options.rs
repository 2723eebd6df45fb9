//! Lab options - the typed payload behind download / backtest / hyperopt runs

use std::collections::BTreeSet;

use chrono::{Duration, Local, NaiveDate};

/// Which toolchain subcommand to assemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabAction {
    Download,
    Backtest,
    Hyperopt,
}

impl LabAction {
    /// Subcommand name understood by the bot toolchain
    pub fn subcommand(&self) -> &'static str {
        match self {
            LabAction::Download => "download-data",
            LabAction::Backtest => "backtesting",
            LabAction::Hyperopt => "hyperopt",
        }
    }

    /// Backtest and hyperopt resolve day counts into an explicit range
    pub fn uses_explicit_range(&self) -> bool {
        !matches!(self, LabAction::Download)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradingMode {
    #[default]
    Futures,
    Spot,
}

impl TradingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Futures => "futures",
            TradingMode::Spot => "spot",
        }
    }
}

/// Strategy-parameter category a hyperopt run may tune.
///
/// Declaration order is the canonical flag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HyperoptSpace {
    Buy,
    Sell,
    Roi,
    Stoploss,
    Trailing,
}

impl HyperoptSpace {
    pub const ALL: [HyperoptSpace; 5] = [
        HyperoptSpace::Buy,
        HyperoptSpace::Sell,
        HyperoptSpace::Roi,
        HyperoptSpace::Stoploss,
        HyperoptSpace::Trailing,
    ];

    pub fn as_flag(&self) -> &'static str {
        match self {
            HyperoptSpace::Buy => "buy",
            HyperoptSpace::Sell => "sell",
            HyperoptSpace::Roi => "roi",
            HyperoptSpace::Stoploss => "stoploss",
            HyperoptSpace::Trailing => "trailing",
        }
    }

    pub fn from_flag(flag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|space| space.as_flag().eq_ignore_ascii_case(flag.trim()))
    }
}

/// Scoring formula used to rank hyperopt candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LossFunction {
    #[default]
    Sharpe,
    Sortino,
    Calmar,
    ProfitDrawDown,
    OnlyProfit,
}

impl LossFunction {
    pub const ALL: [LossFunction; 5] = [
        LossFunction::Sharpe,
        LossFunction::Sortino,
        LossFunction::Calmar,
        LossFunction::ProfitDrawDown,
        LossFunction::OnlyProfit,
    ];

    /// Class name passed to `--hyperopt-loss`
    pub fn class_name(&self) -> &'static str {
        match self {
            LossFunction::Sharpe => "SharpeHyperOptLoss",
            LossFunction::Sortino => "SortinoHyperOptLoss",
            LossFunction::Calmar => "CalmarHyperOptLoss",
            LossFunction::ProfitDrawDown => "ProfitDrawDownHyperOptLoss",
            LossFunction::OnlyProfit => "OnlyProfitHyperOptLoss",
        }
    }

    /// Accepts the class name or its short form (`sharpe`, `SharpeHyperOptLoss`)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|loss| {
            let class = loss.class_name();
            let short = class.trim_end_matches("HyperOptLoss");
            class.eq_ignore_ascii_case(name) || short.eq_ignore_ascii_case(name)
        })
    }

    pub fn description(&self) -> &'static str {
        match self {
            LossFunction::Sharpe => "Sharpe ratio (recommended default)",
            LossFunction::Sortino => "Sortino ratio (downside risk only)",
            LossFunction::Calmar => "Calmar ratio (return over drawdown)",
            LossFunction::ProfitDrawDown => "Balance of profit and drawdown",
            LossFunction::OnlyProfit => "Profit only (greedy)",
        }
    }
}

pub const DEFAULT_TIMEFRAMES: &str = "1m 5m 15m 1h 4h 1d";
pub const DEFAULT_EPOCHS: &str = "100";

/// Everything a lab command can be assembled from.
///
/// Free-text fields stay raw strings; the builder decides how to interpret
/// them, the same way an untouched text box would be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabOptions {
    /// Strategy class name (file stem)
    pub strategy: String,
    /// Config file name inside `user_data`
    pub config_file: String,
    /// "Last N days" input; only used when it is a positive integer
    pub days: String,
    /// Explicit range start, used when `days` is not numeric
    pub start: NaiveDate,
    /// Explicit range end
    pub end: NaiveDate,
    /// Space-separated pair list, e.g. `BTC/USDC:USDC ETH/USDC:USDC`
    pub pairs: String,
    /// Space-separated timeframe list for downloads
    pub timeframes: String,
    pub trading_mode: TradingMode,
    /// Backtest only: `--export trades`
    pub export_trades: bool,
    pub loss: LossFunction,
    pub spaces: BTreeSet<HyperoptSpace>,
    /// Hyperopt epoch count, passed through as typed
    pub epochs: String,
}

impl Default for LabOptions {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            strategy: String::new(),
            config_file: String::new(),
            days: String::new(),
            start: today - Duration::days(30),
            end: today,
            pairs: String::new(),
            timeframes: DEFAULT_TIMEFRAMES.to_string(),
            trading_mode: TradingMode::Futures,
            export_trades: true,
            loss: LossFunction::Sharpe,
            spaces: [HyperoptSpace::Buy, HyperoptSpace::Sell].into_iter().collect(),
            epochs: DEFAULT_EPOCHS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_ordering_is_canonical() {
        let spaces: BTreeSet<_> = [HyperoptSpace::Trailing, HyperoptSpace::Buy, HyperoptSpace::Roi]
            .into_iter()
            .collect();
        let flags: Vec<_> = spaces.iter().map(|s| s.as_flag()).collect();
        assert_eq!(flags, vec!["buy", "roi", "trailing"]);
    }

    #[test]
    fn test_space_from_flag() {
        assert_eq!(HyperoptSpace::from_flag("StopLoss"), Some(HyperoptSpace::Stoploss));
        assert_eq!(HyperoptSpace::from_flag(" roi "), Some(HyperoptSpace::Roi));
        assert_eq!(HyperoptSpace::from_flag("protection"), None);
    }

    #[test]
    fn test_loss_class_names() {
        assert_eq!(LossFunction::default().class_name(), "SharpeHyperOptLoss");
        assert_eq!(
            LossFunction::ProfitDrawDown.class_name(),
            "ProfitDrawDownHyperOptLoss"
        );
        assert_eq!(LossFunction::from_name("sortino"), Some(LossFunction::Sortino));
        assert_eq!(
            LossFunction::from_name("OnlyProfitHyperOptLoss"),
            Some(LossFunction::OnlyProfit)
        );
        assert_eq!(LossFunction::from_name("profitdrawdown"), Some(LossFunction::ProfitDrawDown));
        assert_eq!(LossFunction::from_name("MaxDrawDown"), None);
    }

    #[test]
    fn test_default_options() {
        let opts = LabOptions::default();
        assert_eq!(opts.end - opts.start, Duration::days(30));
        assert!(opts.export_trades);
        assert_eq!(opts.trading_mode, TradingMode::Futures);
        assert_eq!(opts.timeframes, DEFAULT_TIMEFRAMES);
        assert_eq!(opts.spaces.len(), 2);
    }

    #[test]
    fn test_action_subcommands() {
        assert_eq!(LabAction::Download.subcommand(), "download-data");
        assert!(!LabAction::Download.uses_explicit_range());
        assert!(LabAction::Hyperopt.uses_explicit_range());
    }
}
