//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::email_notifier::{EmailConfig, EmailNotifier, NoopNotifier};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_state_adapter::FileStateAdapter;
use crate::adapters::stockcharts_adapter::StockchartsAdapter;
use crate::adapters::yahoo_adapter::YahooAdapter;
use crate::domain::classifier::DeltaRule;
use crate::domain::error::TrendwatchError;
use crate::domain::scheduler::{LoopOptions, Monitor, MonitorWindow};
use crate::domain::signal::Signal;
use crate::domain::simulator::{self, BlacklistRange};
use crate::ports::config_port::ConfigPort;
use crate::ports::notify_port::NotifyPort;
use crate::ports::price_port::PricePort;
use crate::ports::series_port::SeriesPort;
use crate::ports::state_port::StatePort;

#[derive(Parser, Debug)]
#[command(name = "trendwatch", about = "Market breadth trend-change monitor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single check cycle for every configured ticker
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run the continuous monitoring loop
    Monitor {
        #[arg(short, long)]
        config: PathBuf,
        /// Seconds between polls, overrides the config value
        #[arg(long)]
        interval: Option<u64>,
        /// Daily monitoring window as HH:MM-HH:MM, overrides the config value
        #[arg(long)]
        window: Option<String>,
        /// Poll every interval, ignoring window and daily completion
        #[arg(long)]
        continuous: bool,
        /// Exit after the first completed day
        #[arg(long)]
        once: bool,
        /// Terminate on the first error instead of logging and continuing
        #[arg(long)]
        fail_fast: bool,
    },
    /// Simulate trading a stock on indicator trend changes
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        /// Indicator ticker, defaults to the first configured ticker
        #[arg(long)]
        indicator: Option<String>,
        /// Stock symbol to trade
        #[arg(long)]
        stock: Option<String>,
        /// Signal that opens a position (Black or Red)
        #[arg(long)]
        buy_signal: Option<String>,
        /// Months of history to simulate over
        #[arg(long)]
        months: Option<u32>,
        /// Read prices from <SYMBOL>.csv files under this directory instead
        /// of the live price source
        #[arg(long)]
        prices_csv: Option<PathBuf>,
        /// Write the trade list to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// First date on which new positions are suppressed
        #[arg(long)]
        blacklist_start: Option<NaiveDate>,
        /// Last date on which new positions are suppressed
        #[arg(long)]
        blacklist_end: Option<NaiveDate>,
    },
    /// Print the stored state for every configured ticker
    Status {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Test the SMTP connection and credentials without sending
    ValidateEmail {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Check { config } => run_check(&config),
        Command::Monitor {
            config,
            interval,
            window,
            continuous,
            once,
            fail_fast,
        } => run_monitor(&config, interval, window.as_deref(), continuous, once, fail_fast),
        Command::Simulate {
            config,
            indicator,
            stock,
            buy_signal,
            months,
            prices_csv,
            output,
            blacklist_start,
            blacklist_end,
        } => run_simulate(SimulateArgs {
            config,
            indicator,
            stock,
            buy_signal,
            months,
            prices_csv,
            output,
            blacklist_start,
            blacklist_end,
        }),
        Command::Status { config } => run_status(&config),
        Command::ValidateEmail { config } => run_validate_email(&config),
    }
}

fn fail(err: &TrendwatchError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TrendwatchError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

/// Resolved `[monitor]` section.
#[derive(Debug)]
pub struct MonitorConfig {
    pub tickers: Vec<String>,
    pub lookback_days: u32,
    pub rule: DeltaRule,
    pub state_dir: PathBuf,
    pub interval: Duration,
    pub window: Option<MonitorWindow>,
}

impl MonitorConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TrendwatchError> {
        let variant = config
            .get_string("monitor", "source_variant")
            .unwrap_or_else(|| "api".to_string());
        if variant != "api" {
            return Err(TrendwatchError::ConfigInvalid {
                section: "monitor".into(),
                key: "source_variant".into(),
                reason: format!("unsupported variant {variant:?}, only \"api\" is available"),
            });
        }

        let tickers = parse_tickers(
            &config
                .get_string("monitor", "tickers")
                .unwrap_or_else(|| "$NYSI".to_string()),
        );
        if tickers.is_empty() {
            return Err(TrendwatchError::ConfigInvalid {
                section: "monitor".into(),
                key: "tickers".into(),
                reason: "no tickers configured".into(),
            });
        }

        let window = match config.get_string("monitor", "window") {
            Some(s) if !s.trim().is_empty() => Some(MonitorWindow::parse(&s)?),
            _ => None,
        };

        Ok(Self {
            tickers,
            lookback_days: config.get_int("monitor", "lookback_days", 14) as u32,
            rule: DeltaRule::new(config.get_int("monitor", "lookback", 1) as usize),
            state_dir: PathBuf::from(
                config
                    .get_string("monitor", "state_dir")
                    .unwrap_or_else(|| "state".to_string()),
            ),
            interval: Duration::from_secs(config.get_int("monitor", "interval", 300) as u64),
            window,
        })
    }
}

pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn build_notifier(config: &dyn ConfigPort) -> Box<dyn NotifyPort> {
    match EmailConfig::from_config(config) {
        Some(email) => Box::new(EmailNotifier::new(email)),
        None => {
            warn!("no [email] configuration, trend changes will only be logged");
            Box::new(NoopNotifier)
        }
    }
}

fn run_check(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mc = match MonitorConfig::from_config(&config) {
        Ok(mc) => mc,
        Err(e) => return fail(&e),
    };

    let series = StockchartsAdapter::new();
    let store = FileStateAdapter::new(mc.state_dir.clone());
    let notifier = build_notifier(&config);
    let monitor = Monitor::new(
        &series,
        &store,
        notifier.as_ref(),
        mc.rule,
        mc.tickers,
        mc.lookback_days,
    );

    match monitor.check_all(Local::now().date_naive()) {
        Ok(reports) => {
            for report in &reports {
                println!(
                    "{}: {} at {} ({})",
                    report.ticker, report.signal, report.value, report.data_date
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_monitor(
    config_path: &PathBuf,
    interval: Option<u64>,
    window: Option<&str>,
    continuous: bool,
    once: bool,
    fail_fast: bool,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mc = match MonitorConfig::from_config(&config) {
        Ok(mc) => mc,
        Err(e) => return fail(&e),
    };

    let window = match window {
        Some(s) => match MonitorWindow::parse(s) {
            Ok(w) => Some(w),
            Err(e) => return fail(&e),
        },
        None => mc.window,
    };
    let opts = LoopOptions {
        interval: interval.map(Duration::from_secs).unwrap_or(mc.interval),
        window,
        continuous,
        run_once: once,
        fail_fast,
    };

    let series = StockchartsAdapter::new();
    let store = FileStateAdapter::new(mc.state_dir.clone());
    let notifier = build_notifier(&config);
    let monitor = Monitor::new(
        &series,
        &store,
        notifier.as_ref(),
        mc.rule,
        mc.tickers,
        mc.lookback_days,
    );

    match monitor.run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

struct SimulateArgs {
    config: PathBuf,
    indicator: Option<String>,
    stock: Option<String>,
    buy_signal: Option<String>,
    months: Option<u32>,
    prices_csv: Option<PathBuf>,
    output: Option<PathBuf>,
    blacklist_start: Option<NaiveDate>,
    blacklist_end: Option<NaiveDate>,
}

fn run_simulate(args: SimulateArgs) -> ExitCode {
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mc = match MonitorConfig::from_config(&config) {
        Ok(mc) => mc,
        Err(e) => return fail(&e),
    };

    let indicator = args
        .indicator
        .unwrap_or_else(|| mc.tickers[0].clone());
    let stock = match args
        .stock
        .or_else(|| config.get_string("simulate", "stock"))
    {
        Some(stock) => stock,
        None => {
            return fail(&TrendwatchError::ConfigMissing {
                section: "simulate".into(),
                key: "stock".into(),
            });
        }
    };
    let buy_signal = args
        .buy_signal
        .or_else(|| config.get_string("simulate", "buy_signal"))
        .unwrap_or_else(|| "Black".to_string());
    let buy_signal: Signal = match buy_signal.parse() {
        Ok(signal) => signal,
        Err(reason) => {
            return fail(&TrendwatchError::ConfigInvalid {
                section: "simulate".into(),
                key: "buy_signal".into(),
                reason,
            });
        }
    };
    let months = args
        .months
        .unwrap_or_else(|| config.get_int("simulate", "months", 14) as u32);

    let blacklist = match (args.blacklist_start, args.blacklist_end) {
        (Some(start), Some(end)) if start <= end => Some(BlacklistRange { start, end }),
        (None, None) => None,
        _ => {
            return fail(&TrendwatchError::ConfigInvalid {
                section: "simulate".into(),
                key: "blacklist".into(),
                reason: "blacklist needs both --blacklist-start and --blacklist-end, start <= end"
                    .into(),
            });
        }
    };

    let source = StockchartsAdapter::new();
    // 31 days per month over-fetches slightly; the merge drops the excess.
    let series = match source.fetch(&indicator, months * 31) {
        Ok(series) => series,
        Err(e) => return fail(&e),
    };
    let (Some(first), Some(last)) = (series.points().first(), series.points().last()) else {
        return fail(&TrendwatchError::EmptySeries { ticker: indicator });
    };

    let price_dir = args
        .prices_csv
        .or_else(|| config.get_string("simulate", "price_csv_dir").map(PathBuf::from));
    let prices = {
        let port: Box<dyn PricePort> = match price_dir {
            Some(dir) => Box::new(CsvPriceAdapter::new(dir)),
            None => Box::new(YahooAdapter::new()),
        };
        match port.fetch_prices(&stock, first.date, last.date) {
            Ok(prices) => prices,
            Err(e) => return fail(&e),
        }
    };

    let result = simulator::simulate(&mc.rule, &series, &prices, buy_signal, blacklist);
    info!(
        "{} trades for {} on {} signals, {} unmatched dates",
        result.trades.len(),
        stock,
        indicator,
        result.unmatched_dates
    );

    let written = match args.output {
        Some(path) => std::fs::File::create(&path)
            .map_err(TrendwatchError::Io)
            .and_then(|file| write_trades(&result.trades, file)),
        None => write_trades(&result.trades, std::io::stdout().lock()),
    };
    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn write_trades(
    trades: &[simulator::SimulatedTrade],
    out: impl Write,
) -> Result<(), TrendwatchError> {
    let csv_err = |e: csv::Error| TrendwatchError::Io(std::io::Error::other(e));

    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "entry_date",
        "entry_signal",
        "entry_price",
        "exit_date",
        "exit_price",
        "return",
    ])
    .map_err(csv_err)?;
    for trade in trades {
        wtr.write_record([
            trade.entry_date.to_string(),
            trade.entry_signal.to_string(),
            trade.entry_price.to_string(),
            trade.exit_date.to_string(),
            trade.exit_price.to_string(),
            format!("{:.6}", trade.realized_return()),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_status(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mc = match MonitorConfig::from_config(&config) {
        Ok(mc) => mc,
        Err(e) => return fail(&e),
    };

    let store = FileStateAdapter::new(mc.state_dir.clone());
    for ticker in &mc.tickers {
        match store.load(ticker) {
            Ok(Some(state)) => {
                let transition = state
                    .last_transition_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}: {} at {} (checked {}, last transition {})",
                    state.ticker,
                    state.last_signal,
                    state.last_value,
                    state.last_checked_date,
                    transition
                );
                for entry in &state.history {
                    println!("  {}: {} = {}", entry.date, entry.value, entry.signal);
                }
            }
            Ok(None) => println!("{ticker}: no state recorded"),
            Err(e) => return fail(&e),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate_email(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let Some(email) = EmailConfig::from_config(&config) else {
        return fail(&TrendwatchError::ConfigMissing {
            section: "email".into(),
            key: "sender".into(),
        });
    };

    match EmailNotifier::new(email).validate() {
        Ok(()) => {
            println!("SMTP connection and credentials OK");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
