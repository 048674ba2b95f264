//! End-to-end runner tests: config file → cached prices → strategy → reports.
//!
//! No network access; prices come from a pre-populated CSV cache or the
//! synthetic generator.

use chrono::NaiveDate;
use siglab_core::data::{CsvCache, DataSource};
use siglab_runner::export::{export_series_csv, export_summary_csv, write_artifact};
use siglab_runner::{
    compare_strategies, default_comparison, run_experiment, sweep_momentum_lookbacks,
    synthetic_prices, ExperimentConfig, LoadError, LoadOptions, PriceData, RunError, RunSettings,
};

fn config_for(cache_dir: &std::path::Path, strategy: &str) -> ExperimentConfig {
    let toml = format!(
        r#"
[data]
symbols = ["SPY", "QQQ"]
start = "2021-01-01"
end = "2023-12-31"
cache_dir = "{}"

[strategy]
{strategy}

[backtest]
transaction_cost_bps = 2.0
"#,
        cache_dir.display().to_string().replace('\\', "/")
    );
    ExperimentConfig::from_toml_str(&toml).unwrap()
}

fn seed_cache(config: &ExperimentConfig) -> PriceData {
    let query = config.data.price_query();
    let prices = synthetic_prices(&query.symbols, query.start, query.end).unwrap();
    CsvCache::new(&config.data.cache_dir)
        .write(&query.symbols, query.start, &prices)
        .unwrap();
    PriceData::new(prices, DataSource::Synthetic)
}

#[test]
fn offline_run_uses_cached_prices() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), "type = \"momentum\"\nlookback = 20");
    let seeded = seed_cache(&config);

    let opts = LoadOptions {
        offline: true,
        ..Default::default()
    };
    let (data, run) = run_experiment(&config, None, &opts).unwrap();

    assert_eq!(data.source, DataSource::Cache);
    assert_eq!(data.prices.n_rows(), seeded.prices.n_rows());
    assert_eq!(data.prices.columns(), &["SPY".to_string(), "QQQ".to_string()]);
    assert_eq!(run.summary.strategy, "Momentum (20)");
    assert_eq!(run.result.equity_curve().first(), Some(1.0));
    assert!(run.summary.final_equity > 0.0);
    assert!(run.summary.max_drawdown <= 0.0);
}

#[test]
fn offline_without_cache_fails_clearly() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), "type = \"momentum\"\nlookback = 20");
    let opts = LoadOptions {
        offline: true,
        ..Default::default()
    };
    let err = run_experiment(&config, None, &opts).unwrap_err();
    assert!(matches!(
        err,
        RunError::Data(LoadError::NoCachedDataOffline { .. })
    ));
}

#[test]
fn synthetic_fallback_runs_vol_filtered_momentum() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(
        dir.path(),
        "type = \"vol_filtered_momentum\"\nlookback = 60\nvol_lookback = 20\nvol_threshold = 0.02",
    );
    let opts = LoadOptions {
        offline: true,
        synthetic: true,
        ..Default::default()
    };
    let (data, run) = run_experiment(&config, None, &opts).unwrap();

    assert_eq!(data.source, DataSource::Synthetic);
    let gate = run.avg_gate().unwrap();
    assert!((0.0..=1.0).contains(&gate));
    assert_eq!(run.gate_fraction.as_ref().map(Vec::len), Some(2));
}

#[test]
fn run_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(
        dir.path(),
        "type = \"mean_reversion\"\nlookback = 20\nentry_z = 1.0\nexit_z = 0.0",
    );
    seed_cache(&config);
    let opts = LoadOptions {
        offline: true,
        ..Default::default()
    };
    let (d1, r1) = run_experiment(&config, None, &opts).unwrap();
    let (d2, r2) = run_experiment(&config, None, &opts).unwrap();
    assert_eq!(d1.dataset_hash, d2.dataset_hash);
    assert_eq!(r1.result.equity_curve(), r2.result.equity_curve());
    assert_eq!(config.run_id().unwrap(), config.run_id().unwrap());
}

#[test]
fn reports_land_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(
        dir.path().join("cache").as_path(),
        "type = \"momentum\"\nlookback = 20",
    );
    let seeded = seed_cache(&config);

    let rows = sweep_momentum_lookbacks(
        &seeded,
        &[10, 20],
        0.0,
        &RunSettings::from_config(&config),
    )
    .unwrap();
    let summaries: Vec<_> = rows.iter().map(|r| r.summary.clone()).collect();
    let out = dir.path().join("out/summary.csv");
    write_artifact(&out, &export_summary_csv(&summaries).unwrap()).unwrap();
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 3);
    assert!(written.contains("Momentum (10)"));

    let (_, run) = run_experiment(
        &config,
        None,
        &LoadOptions {
            offline: true,
            ..Default::default()
        },
    )
    .unwrap();
    let series = export_series_csv(&run.result).unwrap();
    assert_eq!(series.lines().count(), run.result.equity_curve().len() + 1);
}

#[test]
fn window_dates_come_from_the_data() {
    let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
    let prices = synthetic_prices(&["SPY".into()], start, None).unwrap();
    let data = PriceData::new(prices, DataSource::Synthetic);
    let rows = siglab_runner::rolling_window_analysis(
        &data,
        &siglab_runner::StrategyConfig::default(),
        &siglab_runner::WindowConfig::default(),
        &RunSettings::default(),
    )
    .unwrap();
    assert!(!rows.is_empty());
    assert!(rows.windows(2).all(|w| w[0].window_start < w[1].window_start));
}

#[test]
fn comparison_table_has_one_row_per_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), "type = \"momentum\"\nlookback = 20");
    let seeded = seed_cache(&config);

    let lineup = default_comparison();
    let runs =
        compare_strategies(&seeded, &lineup, &RunSettings::from_config(&config)).unwrap();
    let summaries: Vec<_> = runs.iter().map(|r| r.summary.clone()).collect();
    let csv = export_summary_csv(&summaries).unwrap();

    assert_eq!(csv.lines().count(), lineup.len() + 1);
    assert!(csv.contains("Momentum (20)"));
    assert!(csv.contains("Mean Reversion (20, 1/0.2)"));
    assert!(runs.iter().all(|r| r.result.equity_curve().first() == Some(1.0)));
}
