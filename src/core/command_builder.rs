//! Command Builder
//!
//! Turns [`LabOptions`] into a single reviewable command line. Nothing here
//! executes anything: the text goes to a human first, and only an explicit
//! execute request hands it to the process executor.

use chrono::{Days, Local, NaiveDate};

use super::lab_options::{HyperoptSpace, LabAction, LabOptions, DEFAULT_EPOCHS};

/// Compact date form used by `--timerange`
const TIMERANGE_FORMAT: &str = "%Y%m%d";

/// Spaces used when none are selected
const FALLBACK_SPACES: [HyperoptSpace; 2] = [HyperoptSpace::Buy, HyperoptSpace::Sell];

/// A generated, not yet executed, command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub action: LabAction,
    pub text: String,
    /// Trimmed pair input to remember in the pair history, if any was given
    pub pairs: Option<String>,
}

/// Assembles toolchain invocations
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    /// `docker compose run --rm freqtrade`
    run_prefix: String,
    /// Pinned "today"; `None` reads the local clock at build time
    today: Option<NaiveDate>,
}

impl CommandBuilder {
    pub fn new(run_prefix: impl Into<String>) -> Self {
        Self {
            run_prefix: run_prefix.into(),
            today: None,
        }
    }

    /// Pin the date used for day-count conversion
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Build the command text for one action
    pub fn build(&self, action: LabAction, opts: &LabOptions) -> BuiltCommand {
        let (base, pairs) = self.base_args(action, opts);
        let mut parts = vec![self.run_prefix.clone(), action.subcommand().to_string(), base];

        match action {
            LabAction::Download => {
                parts.push(format!("--trading-mode {}", opts.trading_mode.as_str()));
                parts.push(format!("-t {}", opts.timeframes.trim()));
            }
            LabAction::Backtest => {
                parts.push(format!("--strategy {}", opts.strategy.trim()));
                if opts.export_trades {
                    parts.push("--export trades".to_string());
                }
            }
            LabAction::Hyperopt => {
                let epochs = match opts.epochs.trim() {
                    "" => DEFAULT_EPOCHS,
                    epochs => epochs,
                };
                parts.push(format!("--strategy {}", opts.strategy.trim()));
                parts.push(format!("--hyperopt-loss {}", opts.loss.class_name()));
                parts.push(spaces_flag(opts));
                parts.push(format!("--epochs {}", epochs));
                parts.push("-j -1".to_string());
            }
        }

        let text = parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        tracing::debug!(action = ?action, command = %text, "Built lab command");

        BuiltCommand { action, text, pairs }
    }

    /// Date-range flag for the action.
    ///
    /// A positive integer day count becomes `--days N` for downloads and an
    /// explicit `--timerange` ending today for backtest and hyperopt. Anything
    /// else falls back to the explicitly selected start and end dates.
    pub fn time_flag(&self, action: LabAction, opts: &LabOptions) -> String {
        let days_text = opts.days.trim();
        if let Some(days) = parse_day_count(days_text) {
            if !action.uses_explicit_range() {
                return format!("--days {}", days_text);
            }
            let today = self.today();
            if let Some(start) = today.checked_sub_days(Days::new(days)) {
                return timerange(start, today);
            }
            tracing::warn!("Day count {} reaches before the calendar start, using explicit dates", days);
        }
        timerange(opts.start, opts.end)
    }

    /// `--config user_data/<file> <time flag> [--pairs ...]`
    fn base_args(&self, action: LabAction, opts: &LabOptions) -> (String, Option<String>) {
        let mut base = format!(
            "--config user_data/{} {}",
            opts.config_file.trim(),
            self.time_flag(action, opts)
        );

        let raw_pairs = opts.pairs.trim();
        if raw_pairs.is_empty() {
            return (base, None);
        }

        base.push_str(" --pairs ");
        base.push_str(&normalize_pairs(raw_pairs));
        (base, Some(raw_pairs.to_string()))
    }
}

/// Collapse any run of whitespace to a single space
pub fn normalize_pairs(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_day_count(text: &str) -> Option<u64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<u64>().ok().filter(|days| *days > 0)
}

fn timerange(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "--timerange {}-{}",
        start.format(TIMERANGE_FORMAT),
        end.format(TIMERANGE_FORMAT)
    )
}

fn spaces_flag(opts: &LabOptions) -> String {
    let spaces: Vec<&str> = if opts.spaces.is_empty() {
        FALLBACK_SPACES.iter().map(|s| s.as_flag()).collect()
    } else {
        opts.spaces.iter().map(|s| s.as_flag()).collect()
    };
    format!("--spaces {}", spaces.join(" "))
}
