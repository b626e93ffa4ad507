//! Dipwatch CLI: daily buy-signal evaluation and alerting.
//!
//! Commands:
//! - `evaluate`: run the pipeline and print a summary of the latest day
//! - `signals`: list every day the buy signal fired
//! - `chart`: text chart of close, Bollinger bands and buy markers
//! - `export`: write the full signal table as CSV or JSON
//! - `notify`: gate the latest day and send an alert
//! - `ledger list` / `ledger clear`: inspect or reset recorded alerts

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use dipwatch_core::data::FetchPeriod;
use dipwatch_core::NotifyMode;
use dipwatch_runner::export::{
    export_json_file, export_signals_csv, render_buy_listing, render_summary,
};
use dipwatch_runner::ledger::DEFAULT_LEDGER_DIR;
use dipwatch_runner::settings::DEFAULT_SECRETS_PATH;
use dipwatch_runner::transport::DEFAULT_OUTBOX_DIR;
use dipwatch_runner::{
    build_provider, init_logging, render_chart, run_evaluation, run_notification,
    select_transport, sender, AlertLedger, ChartOptions, DispatchOutcome, Dispatcher, Evaluation,
    LoadOptions, Settings, SourceChoice,
};

#[derive(Parser)]
#[command(
    name = "dipwatch",
    about = "Dipwatch CLI: daily ETF dip-buying signal and alerts"
)]
struct Cli {
    /// Secrets file (TOML). Missing file means environment and defaults only.
    #[arg(long, global = true, default_value = DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

/// Options shared by every command that evaluates a ticker.
#[derive(Args)]
struct DataArgs {
    /// Ticker symbol. Defaults to TICKER from settings, then VWRL.AS.
    #[arg(long)]
    ticker: Option<String>,

    /// History to fetch: max, <n>y or <n>d.
    #[arg(long, default_value = "max")]
    period: FetchPeriod,

    /// Price supplier.
    #[arg(long, value_enum, default_value = "yahoo")]
    source: Source,

    /// Directory of `<TICKER>.csv` files for `--source csv`.
    #[arg(long, default_value = "data")]
    csv_dir: PathBuf,

    /// Fall back to synthetic prices when the supplier fails (results are tagged).
    #[arg(long, default_value_t = false)]
    synthetic_fallback: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and print a summary of the latest day.
    Evaluate {
        #[command(flatten)]
        data: DataArgs,
    },
    /// List every day the buy signal fired.
    Signals {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Text chart of close with Bollinger bands and buy markers.
    Chart {
        #[command(flatten)]
        data: DataArgs,

        /// Number of most recent days to plot.
        #[arg(long, default_value_t = 100)]
        width: usize,

        /// Chart height in lines.
        #[arg(long, default_value_t = 20)]
        height: usize,
    },
    /// Write the full signal table.
    Export {
        #[command(flatten)]
        data: DataArgs,

        /// Output file.
        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },
    /// Gate the latest day and send an alert.
    Notify {
        #[command(flatten)]
        data: DataArgs,

        /// live, test or forced. test and forced require DEBUG_MODE.
        #[arg(long, default_value = "live")]
        mode: NotifyMode,

        /// Log the message instead of writing it to the outbox.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Alert ledger directory.
        #[arg(long, default_value = DEFAULT_LEDGER_DIR)]
        ledger_dir: PathBuf,

        /// Outbox directory for `.eml` files.
        #[arg(long, default_value = DEFAULT_OUTBOX_DIR)]
        outbox_dir: PathBuf,
    },
    /// Alert ledger commands.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Show recorded alerts.
    List {
        /// Only this ticker.
        #[arg(long)]
        ticker: Option<String>,

        #[arg(long, default_value = DEFAULT_LEDGER_DIR)]
        ledger_dir: PathBuf,
    },
    /// Remove recorded alerts so the next live run may alert again.
    Clear {
        /// Only this ticker.
        #[arg(long)]
        ticker: Option<String>,

        #[arg(long, default_value = DEFAULT_LEDGER_DIR)]
        ledger_dir: PathBuf,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(&cli.secrets, |key| std::env::var(key).ok())
        .context("failed to load settings")?;
    init_logging(cli.log_json, settings.debug_mode).context("failed to initialize logging")?;

    match cli.command {
        Commands::Evaluate { data } => {
            let evaluation = evaluate(&data, &settings)?;
            print!("{}", render_summary(&evaluation));
            Ok(())
        }
        Commands::Signals { data } => {
            let evaluation = evaluate(&data, &settings)?;
            print!("{}", render_buy_listing(&evaluation.table));
            Ok(())
        }
        Commands::Chart {
            data,
            width,
            height,
        } => {
            let evaluation = evaluate(&data, &settings)?;
            print!(
                "{}",
                render_chart(&evaluation.table, ChartOptions { width, height })
            );
            Ok(())
        }
        Commands::Export {
            data,
            output,
            format,
        } => run_export(&data, &settings, &output, format),
        Commands::Notify {
            data,
            mode,
            dry_run,
            ledger_dir,
            outbox_dir,
        } => run_notify(&data, &settings, mode, dry_run, &ledger_dir, &outbox_dir),
        Commands::Ledger { action } => match action {
            LedgerAction::List { ticker, ledger_dir } => run_ledger_list(&ledger_dir, ticker),
            LedgerAction::Clear {
                ticker,
                ledger_dir,
                confirm,
            } => run_ledger_clear(&ledger_dir, ticker, confirm),
        },
    }
}

fn evaluate(data: &DataArgs, settings: &Settings) -> Result<Evaluation> {
    let ticker = data.ticker.as_deref().unwrap_or(&settings.ticker);
    let today = chrono::Local::now().date_naive();
    let choice = match data.source {
        Source::Yahoo => SourceChoice::Yahoo,
        Source::Csv => SourceChoice::Csv(data.csv_dir.clone()),
        Source::Synthetic => SourceChoice::Synthetic,
    };
    let provider = build_provider(&choice, today)?;
    let opts = LoadOptions {
        period: data.period,
        synthetic_fallback: data.synthetic_fallback,
        today,
    };

    let evaluation = run_evaluation(ticker, provider.as_ref(), &opts, &settings.strategy)?;
    if evaluation.has_synthetic {
        eprintln!("WARNING: {ticker} was evaluated on synthetic data");
    }
    Ok(evaluation)
}

fn run_export(
    data: &DataArgs,
    settings: &Settings,
    output: &Path,
    format: ExportFormat,
) -> Result<()> {
    let evaluation = evaluate(data, settings)?;
    match format {
        ExportFormat::Csv => export_signals_csv(&evaluation.table, output)?,
        ExportFormat::Json => export_json_file(&evaluation, output)?,
    }
    println!(
        "Exported {} rows for {} to {}",
        evaluation.table.len(),
        evaluation.ticker,
        output.display()
    );
    Ok(())
}

fn run_notify(
    data: &DataArgs,
    settings: &Settings,
    mode: NotifyMode,
    dry_run: bool,
    ledger_dir: &Path,
    outbox_dir: &Path,
) -> Result<()> {
    if !settings.allows(mode) {
        bail!("--mode {mode} requires DEBUG_MODE to be enabled");
    }
    let evaluation = evaluate(data, settings)?;

    let transport = select_transport(settings, dry_run, outbox_dir);
    let ledger = AlertLedger::new(ledger_dir);
    let dispatcher = Dispatcher::new(transport.as_ref(), sender(settings)).with_ledger(&ledger);
    let report = run_notification(&evaluation, mode, settings, &dispatcher)?;

    match &report.outcome {
        None => println!(
            "No buy signal for {} on {}; nothing sent.",
            evaluation.ticker,
            evaluation
                .table
                .latest()
                .map(|r| r.date.to_string())
                .unwrap_or_default()
        ),
        Some(outcome) => {
            println!("{} ({mode}): {outcome}", evaluation.ticker);
            if let DispatchOutcome::Failed { .. } = outcome {
                eprintln!("WARNING: alert was not delivered; the next run will retry");
            }
        }
    }
    info!(ticker = %evaluation.ticker, %mode, "notify finished");
    Ok(())
}

fn run_ledger_list(ledger_dir: &Path, ticker: Option<String>) -> Result<()> {
    let ledger = AlertLedger::new(ledger_dir);
    let records = ledger.list(ticker.as_deref())?;
    if records.is_empty() {
        println!("No recorded alerts in {}", ledger.root().display());
        return Ok(());
    }

    println!(
        "{:<12} {:<10} {:>10} {:>10}  claimed at",
        "ticker", "date", "price", "recipients"
    );
    for r in &records {
        println!(
            "{:<12} {:<10} {:>10.2} {:>10}  {}",
            r.ticker,
            r.date,
            r.price,
            r.recipients,
            r.claimed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

fn run_ledger_clear(ledger_dir: &Path, ticker: Option<String>, confirm: bool) -> Result<()> {
    let ledger = AlertLedger::new(ledger_dir);
    if !confirm {
        let records = ledger.list(ticker.as_deref())?;
        for r in &records {
            println!("  would remove: {} {}", r.ticker, r.date);
        }
        println!(
            "\n{} record(s) would be removed. Use --confirm to delete.",
            records.len()
        );
        return Ok(());
    }

    let removed = ledger.clear(ticker.as_deref())?;
    println!("Removed {removed} alert record(s)");
    Ok(())
}
