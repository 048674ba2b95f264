//! Siglab CLI — download, run, compare, sweep, rolling-window and inspect commands.
//!
//! Commands:
//! - `download` — fetch prices from Yahoo Finance into the CSV cache
//! - `run` — backtest the strategy from a TOML config (flags override the file)
//! - `compare` — momentum, mean reversion and vol-filtered momentum side by side
//! - `sweep lookbacks` / `sweep vol-thresholds` — parameter sensitivity tables
//! - `rolling` — rolling-window robustness, optionally base vs vol-filtered
//! - `inspect` — price statistics, or with `--signals` the signals and positions
//!
//! Logging goes to stderr; `RUST_LOG` overrides the default `info` level.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use siglab_core::data::{CsvCache, DataSource, PriceProvider, PriceQuery, YahooProvider};
use siglab_core::Frame;
use siglab_runner::export::{
    export_json, export_lookback_sweep_csv, export_series_csv, export_summary_csv,
    export_vol_compare_csv, export_vol_sweep_csv, export_windows_csv, format_summary_table,
    write_artifact,
};
use siglab_runner::{
    compare_strategies, compare_vol_filter, default_comparison, describe, inspect_signals,
    load_price_data, position_activity, rolling_window_analysis, run_strategy,
    sweep_momentum_lookbacks, sweep_vol_thresholds, ExperimentConfig, InspectParams,
    LoadOptions, PriceData, RollingSummary, RunSettings, WindowConfig, DEFAULT_LOOKBACKS,
    DEFAULT_VOL_THRESHOLDS,
};

#[derive(Parser)]
#[command(
    name = "siglab",
    about = "Siglab — signal research and vectorized backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Data selection shared by every command that needs prices.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to a TOML experiment config. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols (e.g., SPY QQQ). Defaults to the config's symbols.
    symbols: Vec<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Transaction cost in basis points per unit of turnover.
    #[arg(long)]
    cost_bps: Option<f64>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Re-download even if cached.
    #[arg(long, default_value_t = false)]
    force_download: bool,

    /// Write CSV/JSON reports into this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download prices from Yahoo Finance and cache them as CSV.
    Download {
        /// Symbols to download (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2015-01-01")]
        start: String,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Price field: "Adj Close", "Close", "Open", "High" or "Low".
        #[arg(long, default_value = "Adj Close")]
        field: String,

        /// Bar interval: 1d, 1wk or 1mo.
        #[arg(long, default_value = "1d")]
        interval: String,

        /// Cache directory.
        #[arg(long, default_value = "data/raw")]
        cache_dir: PathBuf,
    },
    /// Backtest the configured strategy and print its summary.
    Run {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Run several strategies on the same prices and print one table.
    ///
    /// The line-up is momentum (20), mean reversion (20, 1.0/0.2) and
    /// vol-filtered momentum (60, vol 20 <= 0.02). A strategy from --config
    /// is added in front when it is not already part of it.
    Compare {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Parameter sweeps.
    Sweep {
        #[command(subcommand)]
        kind: SweepKind,
    },
    /// Rolling-window robustness analysis.
    Rolling {
        #[command(flatten)]
        data: DataArgs,

        /// Rows per window.
        #[arg(long, default_value_t = 756)]
        window_len: usize,

        /// Rows between window starts.
        #[arg(long, default_value_t = 21)]
        step: usize,

        /// Compare momentum with and without the volatility gate.
        #[arg(long, default_value_t = false)]
        compare_vol: bool,

        /// Momentum lookback for --compare-vol.
        #[arg(long, default_value_t = 60)]
        lookback: usize,

        /// Volatility window for --compare-vol.
        #[arg(long, default_value_t = 20)]
        vol_lookback: usize,

        /// Volatility ceiling for --compare-vol.
        #[arg(long, default_value_t = 0.02)]
        vol_threshold: f64,
    },
    /// Print summary statistics of the resolved price table.
    Inspect {
        #[command(flatten)]
        data: DataArgs,

        /// Show momentum and z-score signals with the positions they produce.
        #[arg(long, default_value_t = false)]
        signals: bool,

        /// Rows of each table to print with --signals.
        #[arg(long, default_value_t = 30)]
        rows: usize,
    },
}

#[derive(Subcommand)]
enum SweepKind {
    /// Momentum over a grid of lookbacks.
    Lookbacks {
        #[command(flatten)]
        data: DataArgs,

        /// Comma-separated lookbacks.
        #[arg(long, value_delimiter = ',')]
        lookbacks: Option<Vec<usize>>,

        /// Momentum dead band.
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,
    },
    /// Vol-filtered momentum over a grid of volatility ceilings.
    VolThresholds {
        #[command(flatten)]
        data: DataArgs,

        /// Comma-separated volatility ceilings.
        #[arg(long, value_delimiter = ',')]
        thresholds: Option<Vec<f64>>,

        /// Momentum lookback.
        #[arg(long, default_value_t = 60)]
        lookback: usize,

        /// Volatility window.
        #[arg(long, default_value_t = 20)]
        vol_lookback: usize,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbols,
            start,
            end,
            field,
            interval,
            cache_dir,
        } => run_download(symbols, &start, end.as_deref(), &field, &interval, cache_dir),
        Commands::Run { data } => run_cmd(&data),
        Commands::Compare { data } => run_compare(&data),
        Commands::Sweep { kind } => match kind {
            SweepKind::Lookbacks {
                data,
                lookbacks,
                threshold,
            } => run_lookback_sweep(
                &data,
                &lookbacks.unwrap_or_else(|| DEFAULT_LOOKBACKS.to_vec()),
                threshold,
            ),
            SweepKind::VolThresholds {
                data,
                thresholds,
                lookback,
                vol_lookback,
            } => run_vol_sweep(
                &data,
                &thresholds.unwrap_or_else(|| DEFAULT_VOL_THRESHOLDS.to_vec()),
                lookback,
                vol_lookback,
            ),
        },
        Commands::Rolling {
            data,
            window_len,
            step,
            compare_vol,
            lookback,
            vol_lookback,
            vol_threshold,
        } => {
            if window_len < 2 || step == 0 {
                bail!("--window-len must be >= 2 and --step must be >= 1");
            }
            let window = WindowConfig::new(window_len, step);
            if compare_vol {
                run_vol_compare(&data, &window, lookback, vol_lookback, vol_threshold)
            } else {
                run_rolling(&data, &window)
            }
        }
        Commands::Inspect {
            data,
            signals,
            rows,
        } => {
            if signals {
                run_inspect_signals(&data, rows)
            } else {
                run_inspect(&data)
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

// ─── Data resolution ────────────────────────────────────────────────

/// Load the config file (or defaults) and apply command-line overrides.
fn resolve_config(args: &DataArgs) -> Result<ExperimentConfig> {
    let mut config = match &args.config {
        Some(path) => ExperimentConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    if !args.symbols.is_empty() {
        config.data.symbols = args.symbols.iter().map(|s| s.to_uppercase()).collect();
    }
    if let Some(start) = args.start.as_deref().map(parse_date).transpose()? {
        config.data.start = start;
    }
    if let Some(end) = args.end.as_deref().map(parse_date).transpose()? {
        config.data.end = Some(end);
    }
    if let Some(dir) = &args.cache_dir {
        config.data.cache_dir = dir.clone();
    }
    if let Some(bps) = args.cost_bps {
        config.backtest.transaction_cost_bps = bps;
    }

    config.validate().context("invalid experiment settings")?;
    Ok(config)
}

fn load_data(args: &DataArgs, config: &ExperimentConfig) -> Result<PriceData> {
    let opts = LoadOptions {
        offline: args.offline,
        synthetic: args.synthetic,
        force_download: args.force_download,
    };
    let provider = if args.offline {
        None
    } else {
        Some(YahooProvider::new().context("failed to build HTTP client")?)
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn PriceProvider);

    let cache = CsvCache::new(&config.data.cache_dir);
    let data = load_price_data(&config.data.price_query(), &cache, provider_ref, &opts)
        .context("failed to load prices")?;

    if data.source == DataSource::Synthetic {
        println!("*** SYNTHETIC DATA: results do not reflect any real market ***");
    }
    println!(
        "Data: {} ({} rows, {} to {}, source {}, hash {})",
        config.data.symbols.join(", "),
        data.prices.n_rows(),
        data.prices.index().first().map(|d| d.to_string()).unwrap_or_default(),
        data.prices.index().last().map(|d| d.to_string()).unwrap_or_default(),
        data.source,
        &data.dataset_hash[..12.min(data.dataset_hash.len())],
    );
    Ok(data)
}

fn save(out_dir: Option<&Path>, name: &str, contents: &str) -> Result<()> {
    if let Some(dir) = out_dir {
        let path = dir.join(name);
        write_artifact(&path, contents)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_download(
    symbols: Vec<String>,
    start: &str,
    end: Option<&str>,
    field: &str,
    interval: &str,
    cache_dir: PathBuf,
) -> Result<()> {
    let mut query = PriceQuery::new(
        symbols.iter().map(|s| s.to_uppercase()).collect(),
        parse_date(start)?,
    );
    query.end = end.map(parse_date).transpose()?;
    query.field = field.parse()?;
    query.interval = interval.parse()?;

    let provider = YahooProvider::new().context("failed to build HTTP client")?;
    let prices = provider
        .fetch(&query)
        .with_context(|| format!("download failed for {}", query.symbols.join(", ")))?;
    let path = CsvCache::new(cache_dir)
        .write(&query.symbols, query.start, &prices)
        .context("failed to write cache file")?;

    info!(rows = prices.n_rows(), path = %path.display(), "download complete");
    println!(
        "Saved {} rows for {} to {}",
        prices.n_rows(),
        query.symbols.join(", "),
        path.display()
    );
    Ok(())
}

fn run_cmd(args: &DataArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?;
    let label = config.strategy.label();
    let settings = RunSettings::from_config(&config);
    let run = run_strategy(&label, &data, &config.strategy, &settings)
        .with_context(|| format!("backtest failed for {label}"))?;

    println!();
    print!("{}", format_summary_table(std::slice::from_ref(&run.summary)));
    if let Some(gate) = run.avg_gate() {
        println!("Average gate open: {:.1}%", gate * 100.0);
    }
    println!("Run ID: {}", config.run_id()?);

    let out = args.out_dir.as_deref();
    let summary_csv = export_summary_csv(std::slice::from_ref(&run.summary))?;
    save(out, "summary.csv", &summary_csv)?;
    save(out, "series.csv", &export_series_csv(&run.result)?)?;
    save(out, "summary.json", &export_json(&run.summary)?)?;
    Ok(())
}

fn run_compare(args: &DataArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?;

    let mut lineup = default_comparison();
    if args.config.is_some() && !lineup.contains(&config.strategy) {
        lineup.insert(0, config.strategy);
    }
    let runs = compare_strategies(&data, &lineup, &RunSettings::from_config(&config))
        .context("strategy comparison failed")?;

    let summaries: Vec<_> = runs.iter().map(|r| r.summary.clone()).collect();
    println!();
    print!("{}", format_summary_table(&summaries));
    for run in &runs {
        if let Some(gate) = run.avg_gate() {
            println!(
                "{}: gate open {:.1}% of periods",
                run.summary.strategy,
                gate * 100.0
            );
        }
    }

    let csv = export_summary_csv(&summaries)?;
    save(args.out_dir.as_deref(), "compare_summary.csv", &csv)?;
    Ok(())
}

fn run_lookback_sweep(args: &DataArgs, lookbacks: &[usize], threshold: f64) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?;
    let settings = RunSettings::from_config(&config);
    let rows = sweep_momentum_lookbacks(&data, lookbacks, threshold, &settings)
        .context("lookback sweep failed")?;

    println!();
    let summaries: Vec<_> = rows.iter().map(|r| r.summary.clone()).collect();
    print!("{}", format_summary_table(&summaries));

    let csv = export_lookback_sweep_csv(&rows)?;
    save(args.out_dir.as_deref(), "lookback_sweep.csv", &csv)?;
    Ok(())
}

fn run_vol_sweep(
    args: &DataArgs,
    thresholds: &[f64],
    lookback: usize,
    vol_lookback: usize,
) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?.trimmed();
    let rows = sweep_vol_thresholds(
        &data,
        lookback,
        vol_lookback,
        thresholds,
        &RunSettings::from_config(&config),
    )
    .context("volatility threshold sweep failed")?;

    println!();
    println!(
        "{:>10}  {:>8}  {:>9}  {:>9}  {:>8}",
        "Vol Ceil", "Sharpe", "Ann Ret", "Max DD", "Gate %"
    );
    for row in &rows {
        println!(
            "{:>10.4}  {:>8.3}  {:>8.2}%  {:>8.2}%  {:>7.1}%",
            row.vol_threshold,
            row.summary.sharpe,
            row.summary.annual_return * 100.0,
            row.summary.max_drawdown * 100.0,
            row.avg_gate * 100.0,
        );
    }

    let csv = export_vol_sweep_csv(&rows)?;
    save(args.out_dir.as_deref(), "vol_threshold_sweep.csv", &csv)?;
    Ok(())
}

fn run_rolling(args: &DataArgs, window: &WindowConfig) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?;
    let rows = rolling_window_analysis(
        &data,
        &config.strategy,
        window,
        &RunSettings::from_config(&config),
    )
    .context("rolling-window analysis failed")?;

    let summary = RollingSummary::from_windows(&rows);
    println!();
    println!("{} over {} windows", config.strategy.label(), rows.len());
    println!(
        "{:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Metric", "Mean", "Std", "Min", "Median", "Max"
    );
    for (name, d) in [
        ("Sharpe", summary.sharpe),
        ("Ann Return", summary.annual_return),
        ("Max Drawdown", summary.max_drawdown),
    ] {
        println!(
            "{:<14} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
            name, d.mean, d.std, d.min, d.median, d.max
        );
    }

    let out = args.out_dir.as_deref();
    save(out, "rolling_windows.csv", &export_windows_csv(&rows)?)?;
    save(out, "rolling_summary.json", &export_json(&summary)?)?;
    Ok(())
}

fn run_vol_compare(
    args: &DataArgs,
    window: &WindowConfig,
    lookback: usize,
    vol_lookback: usize,
    vol_threshold: f64,
) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?;
    let rows = compare_vol_filter(
        &data,
        lookback,
        vol_lookback,
        vol_threshold,
        window,
        &RunSettings::from_config(&config),
    )
    .context("rolling vol-filter comparison failed")?;

    let base: Vec<f64> = rows.iter().map(|r| r.sharpe_base).collect();
    let filtered: Vec<f64> = rows.iter().map(|r| r.sharpe_filtered).collect();
    let improved = rows
        .iter()
        .filter(|r| r.sharpe_filtered > r.sharpe_base)
        .count();

    println!();
    println!("Momentum ({lookback}) vs vol-filtered over {} windows", rows.len());
    println!("{:<12} {:>8} {:>8} {:>8}", "", "Mean", "Median", "Std");
    for (name, d) in [("Base", describe(&base)), ("Filtered", describe(&filtered))] {
        println!("{:<12} {:>8.3} {:>8.3} {:>8.3}", name, d.mean, d.median, d.std);
    }
    if !rows.is_empty() {
        println!(
            "Filter improved Sharpe in {improved}/{} windows ({:.1}%)",
            rows.len(),
            improved as f64 / rows.len() as f64 * 100.0
        );
    }

    let csv = export_vol_compare_csv(&rows)?;
    save(args.out_dir.as_deref(), "rolling_vol_compare.csv", &csv)?;
    Ok(())
}

fn run_inspect(args: &DataArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?;

    println!();
    println!(
        "{:<8} {:>8} {:>8} {:>10} {:>10} {:>10} {:>10}",
        "Symbol", "Prices", "Missing", "Mean LR", "Std LR", "Min LR", "Max LR"
    );
    for (name, prices) in data.prices.iter_columns() {
        let missing = prices.iter().filter(|p| !p.is_finite()).count();
        let lr = data.log_returns.column(name).map(describe);
        let (mean, std, min, max) = lr
            .map(|d| (d.mean, d.std, d.min, d.max))
            .unwrap_or((f64::NAN, f64::NAN, f64::NAN, f64::NAN));
        println!(
            "{:<8} {:>8} {:>8} {:>10.5} {:>10.5} {:>10.5} {:>10.5}",
            name,
            prices.len() - missing,
            missing,
            mean,
            std,
            min,
            max
        );
    }
    Ok(())
}

fn run_inspect_signals(args: &DataArgs, rows: usize) -> Result<()> {
    let config = resolve_config(args)?;
    let data = load_data(args, &config)?;
    let params = InspectParams::default();
    let snap = inspect_signals(&data.prices, &params).context("signal inspection failed")?;

    let signal_cell = |s: &Option<f64>| match s {
        Some(v) => format!("{v:.4}"),
        None => "-".to_string(),
    };
    let position_cell = |p: &siglab_core::Position| p.value().to_string();

    let momentum = format!("Momentum ({}) signal", params.momentum_lookback);
    print_head(&momentum, &snap.momentum, rows, signal_cell);
    print_head("Momentum positions", &snap.momentum_positions, rows, position_cell);
    let zscore = format!("Mean reversion ({}) z-score", params.zscore_lookback);
    print_head(&zscore, &snap.zscore, rows, signal_cell);
    print_head(
        "Mean reversion positions",
        &snap.mean_reversion_positions,
        rows,
        position_cell,
    );

    let mut report = Vec::new();
    for (name, positions) in [
        ("Momentum", &snap.momentum_positions),
        ("Mean reversion", &snap.mean_reversion_positions),
    ] {
        println!();
        println!("{name}: first non-flat days");
        for row in position_activity(positions, 10) {
            let dates: Vec<String> = row.first_active.iter().map(|d| d.to_string()).collect();
            println!(
                "  {:<8} long {:>5}  flat {:>5}  short {:>5}  first: {}",
                row.column,
                row.long,
                row.flat,
                row.short,
                if dates.is_empty() {
                    "none".to_string()
                } else {
                    dates.join(", ")
                }
            );
            report.push((name, row));
        }
    }

    let json = export_json(&report)?;
    save(args.out_dir.as_deref(), "position_activity.json", &json)?;
    Ok(())
}

/// Print the first `rows` rows of `table`, one column per instrument.
fn print_head<T>(title: &str, table: &Frame<T>, rows: usize, cell: impl Fn(&T) -> String) {
    let shown = rows.min(table.n_rows());
    println!();
    println!("=== {title} (first {shown} rows) ===");
    print!("{:<12}", "Date");
    for name in table.columns() {
        print!(" {name:>10}");
    }
    println!();
    for (i, date) in table.index().iter().take(shown).enumerate() {
        print!("{:<12}", date.to_string());
        for j in 0..table.n_cols() {
            print!(" {:>10}", cell(&table.column_at(j)[i]));
        }
        println!();
    }
}
