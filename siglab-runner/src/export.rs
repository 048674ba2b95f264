//! Report export — CSV tables, JSON summaries, and terminal tables.
//!
//! CSV writers render into a `String`; `write_artifact` puts any rendered
//! report on disk, creating parent directories as needed. Undefined metrics
//! are written as `NaN` in CSV and `null` in JSON.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use siglab_core::BacktestResult;

use crate::metrics::{drawdown_series, PerformanceSummary};
use crate::rolling::{VolCompareRow, WindowResult};
use crate::sweep::{LookbackRow, VolThresholdRow};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize any report value to pretty JSON.
pub fn export_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize report to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

const SUMMARY_HEADER: [&str; 7] = [
    "strategy",
    "final_equity",
    "annual_return",
    "annual_vol",
    "sharpe",
    "max_drawdown",
    "win_rate",
];

fn summary_fields(s: &PerformanceSummary) -> [String; 6] {
    [
        fmt(s.final_equity),
        fmt(s.annual_return),
        fmt(s.annual_vol),
        fmt(s.sharpe),
        fmt(s.max_drawdown),
        fmt(s.win_rate),
    ]
}

fn fmt(v: f64) -> String {
    format!("{v:.6}")
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per strategy.
pub fn export_summary_csv(rows: &[PerformanceSummary]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(SUMMARY_HEADER)?;
    for s in rows {
        let mut record = vec![s.strategy.clone()];
        record.extend(summary_fields(s));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Per-date strategy log return, equity and drawdown.
///
/// Columns: date, strategy_log_return, equity, drawdown
pub fn export_series_csv(result: &BacktestResult) -> Result<String> {
    let returns = result.strategy_log_returns();
    let equity = result.equity_curve();
    let drawdown = drawdown_series(equity.values());

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "strategy_log_return", "equity", "drawdown"])?;
    for (i, (date, r)) in returns.iter().enumerate() {
        wtr.write_record([
            date.to_string(),
            format!("{r:.8}"),
            format!("{:.8}", equity.values()[i]),
            format!("{:.8}", drawdown[i]),
        ])?;
    }
    finish(wtr)
}

pub fn export_lookback_sweep_csv(rows: &[LookbackRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["lookback"];
    header.extend(&SUMMARY_HEADER[1..]);
    wtr.write_record(&header)?;
    for row in rows {
        let mut record = vec![row.lookback.to_string()];
        record.extend(summary_fields(&row.summary));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

pub fn export_vol_sweep_csv(rows: &[VolThresholdRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["vol_threshold"];
    header.extend(&SUMMARY_HEADER[1..]);
    header.push("avg_gate");
    wtr.write_record(&header)?;
    for row in rows {
        let mut record = vec![format!("{}", row.vol_threshold)];
        record.extend(summary_fields(&row.summary));
        record.push(fmt(row.avg_gate));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Columns: window_start, window_end, sharpe, annual_return, annual_vol,
/// max_drawdown, final_equity
pub fn export_windows_csv(rows: &[WindowResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "window_start",
        "window_end",
        "sharpe",
        "annual_return",
        "annual_vol",
        "max_drawdown",
        "final_equity",
    ])?;
    for w in rows {
        wtr.write_record([
            w.window_start.to_string(),
            w.window_end.to_string(),
            fmt(w.sharpe),
            fmt(w.annual_return),
            fmt(w.annual_vol),
            fmt(w.max_drawdown),
            fmt(w.final_equity),
        ])?;
    }
    finish(wtr)
}

pub fn export_vol_compare_csv(rows: &[VolCompareRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["window_start", "window_end", "sharpe_base", "sharpe_filtered"])?;
    for row in rows {
        wtr.write_record([
            row.window_start.to_string(),
            row.window_end.to_string(),
            fmt(row.sharpe_base),
            fmt(row.sharpe_filtered),
        ])?;
    }
    finish(wtr)
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write a rendered report, creating parent directories.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Terminal tables ────────────────────────────────────────────────

/// Fixed-width comparison table for terminal output.
pub fn format_summary_table(rows: &[PerformanceSummary]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.strategy.len())
        .max()
        .unwrap_or(0)
        .max("Strategy".len());

    let mut out = format!(
        "{:<name_width$}  {:>10}  {:>10}  {:>10}  {:>8}  {:>8}  {:>8}\n",
        "Strategy", "Final Eq", "Ann Ret", "Ann Vol", "Sharpe", "Max DD", "Win %"
    );
    for r in rows {
        out.push_str(&format!(
            "{:<name_width$}  {:>10.4}  {:>9.2}%  {:>9.2}%  {:>8.3}  {:>7.2}%  {:>7.1}%\n",
            r.strategy,
            r.final_equity,
            r.annual_return * 100.0,
            r.annual_vol * 100.0,
            r.sharpe,
            r.max_drawdown * 100.0,
            r.win_rate * 100.0,
        ));
    }
    out
}
