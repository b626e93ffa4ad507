//! Reporting and export: run summary, buy listing, CSV and JSON.
//!
//! CSV columns follow the signal table: date, close, rsi14, bb_lower,
//! bb_mid, bb_upper, all_time_high, drawdown_pct, buy_signal. Null
//! indicator values are written as empty cells.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use dipwatch_core::SignalTable;

use crate::runner::Evaluation;

const CSV_HEADER: [&str; 9] = [
    "date",
    "close",
    "rsi14",
    "bb_lower",
    "bb_mid",
    "bb_upper",
    "all_time_high",
    "drawdown_pct",
    "buy_signal",
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

fn shown(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}

// ─── CSV export ─────────────────────────────────────────────────────

pub fn write_signals_csv<W: io::Write>(table: &SignalTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for row in table.rows() {
        wtr.write_record([
            row.date.to_string(),
            format!("{:.6}", row.close),
            cell(row.rsi14),
            cell(row.bb_lower),
            cell(row.bb_mid),
            cell(row.bb_upper),
            format!("{:.6}", row.all_time_high),
            cell(row.drawdown_pct),
            row.buy_signal.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn signals_csv(table: &SignalTable) -> Result<String> {
    let mut buf = Vec::new();
    write_signals_csv(table, &mut buf)?;
    String::from_utf8(buf).context("csv output is not utf-8")
}

/// Write the table as CSV. The file appears complete or not at all.
pub fn export_signals_csv(table: &SignalTable, path: &Path) -> Result<()> {
    write_atomic(path, signals_csv(table)?.as_bytes())
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(evaluation: &Evaluation) -> Result<String> {
    serde_json::to_string_pretty(evaluation).context("failed to serialize evaluation to JSON")
}

/// Write the evaluation as pretty JSON. The file appears complete or not at all.
pub fn export_json_file(evaluation: &Evaluation, path: &Path) -> Result<()> {
    write_atomic(path, export_json(evaluation)?.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to move export to {}", path.display()))
}

// ─── Text reports ───────────────────────────────────────────────────

/// Multi-line run summary for the latest row.
pub fn render_summary(evaluation: &Evaluation) -> String {
    let table = &evaluation.table;
    let mut out = String::new();

    let source = if evaluation.has_synthetic {
        format!("{} (SYNTHETIC DATA)", evaluation.source)
    } else {
        evaluation.source.to_string()
    };
    let _ = writeln!(out, "Ticker:        {}", evaluation.ticker);
    let _ = writeln!(out, "Source:        {source}");

    if let (Some(first), Some(latest)) = (table.rows().first(), table.latest()) {
        let _ = writeln!(
            out,
            "Rows:          {} ({} to {})",
            table.len(),
            first.date,
            latest.date
        );
        let _ = writeln!(out, "Latest close:  {:.2}", latest.close);
        let _ = writeln!(out, "RSI(14):       {}", shown(latest.rsi14, 2));
        let _ = writeln!(
            out,
            "Bollinger:     {} / {} / {}",
            shown(latest.bb_lower, 2),
            shown(latest.bb_mid, 2),
            shown(latest.bb_upper, 2)
        );
        let _ = writeln!(
            out,
            "Drawdown:      {}% from ATH {:.2}",
            shown(latest.drawdown_pct, 2),
            latest.all_time_high
        );
        let _ = writeln!(
            out,
            "Signal today:  {}",
            if latest.buy_signal { "BUY" } else { "none" }
        );
    }
    let _ = writeln!(out, "Buy days:      {}", table.buy_count());
    let _ = writeln!(out, "Fingerprint:   {}", evaluation.fingerprint);
    out
}

/// Every buy row: date, close, RSI, lower band, drawdown.
pub fn render_buy_listing(table: &SignalTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}  {:>10}  {:>6}  {:>10}  {:>9}",
        "date", "close", "rsi14", "bb_lower", "drawdown%"
    );
    let mut any = false;
    for row in table.buy_rows() {
        any = true;
        let _ = writeln!(
            out,
            "{:<10}  {:>10.2}  {:>6}  {:>10}  {:>9}",
            row.date,
            row.close,
            shown(row.rsi14, 1),
            shown(row.bb_lower, 2),
            shown(row.drawdown_pct, 1)
        );
    }
    if !any {
        let _ = writeln!(out, "(no buy signals in {} rows)", table.len());
    }
    out
}
