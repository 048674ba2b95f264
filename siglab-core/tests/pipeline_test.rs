//! End-to-end checks of the signal → position → backtest pipeline.

use chrono::NaiveDate;
use siglab_core::components::{
    apply_gate, mean_reversion_zscore, momentum, momentum_signal, sign_threshold_rule,
    vol_regime_filter, zscore_entry_exit_rule,
};
use siglab_core::data::compute_log_returns;
use siglab_core::domain::Position::{Flat, Long, Short};
use siglab_core::{backtest_positions, BacktestConfig, Frame, Position, PriceTable};

fn dates(n: usize) -> Vec<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect()
}

fn single(values: Vec<f64>) -> PriceTable {
    Frame::new(dates(values.len()), vec!["SPY".into()], vec![values]).unwrap()
}

fn wave(n: usize) -> PriceTable {
    let a = (0..n).map(|i| 100.0 + (i as f64 * 0.15).sin() * 8.0 + i as f64 * 0.05).collect();
    let b = (0..n).map(|i| 50.0 + (i as f64 * 0.07).cos() * 3.0).collect();
    Frame::new(dates(n), vec!["A".into(), "B".into()], vec![a, b]).unwrap()
}

#[test]
fn momentum_undefined_before_lookback_and_exact_after() {
    let prices = wave(60);
    for lookback in [1, 5, 20] {
        let signal = momentum_signal(&prices, lookback);
        for (name, col) in signal.iter_columns() {
            let p = prices.column(name).unwrap();
            for t in 0..col.len() {
                if t < lookback {
                    assert_eq!(col[t], None);
                } else {
                    assert_eq!(col[t], Some(p[t] / p[t - lookback] - 1.0));
                }
            }
        }
    }
}

#[test]
fn threshold_rule_is_idempotent_at_zero() {
    let signal = momentum_signal(&wave(80), 10);
    let once = sign_threshold_rule(&signal, 0.0);
    let as_signal = once.map(|p| Some(p.as_f64()));
    let twice = sign_threshold_rule(&as_signal, 0.0);
    assert_eq!(once, twice);
}

#[test]
fn hysteresis_reference_sequence() {
    let z = Frame::new(
        dates(5),
        vec!["X".into()],
        vec![vec![Some(0.0), Some(1.5), Some(0.1), Some(-1.5), Some(0.1)]],
    )
    .unwrap();
    let pos = zscore_entry_exit_rule(&z, 1.0, 0.2);
    assert_eq!(pos.column("X").unwrap(), &[Flat, Short, Flat, Long, Flat]);
}

#[test]
fn reference_backtest() {
    let rets = single(vec![0.01, 0.02, -0.01]);
    let pos = Frame::new(rets.index().to_vec(), vec!["SPY".into()], vec![vec![Long, Long, Flat]])
        .unwrap();
    let result = backtest_positions(&rets, &pos, &BacktestConfig::default()).unwrap();
    let eq = result.equity_curve().values();
    assert_eq!(eq[0], 1.0);
    assert!((eq[1] - 1.02020).abs() < 1e-5);
    assert!((eq[2] - 1.01005).abs() < 1e-5);
}

#[test]
fn reference_cost() {
    let rets = single(vec![0.01, 0.02, -0.01]);
    let pos = Frame::new(rets.index().to_vec(), vec!["SPY".into()], vec![vec![Flat, Long, Long]])
        .unwrap();
    let free = backtest_positions(&rets, &pos, &BacktestConfig::default()).unwrap();
    let costly = backtest_positions(&rets, &pos, &BacktestConfig::with_cost_bps(10.0)).unwrap();
    let diff: Vec<f64> = free
        .strategy_log_returns()
        .values()
        .iter()
        .zip(costly.strategy_log_returns().values())
        .map(|(a, b)| a - b)
        .collect();
    assert_eq!(diff[0], 0.0);
    assert!((diff[1] - 0.001).abs() < 1e-12);
    assert_eq!(diff[2], 0.0);
}

#[test]
fn full_pipeline_runs_on_price_table() {
    let prices = wave(300);
    let rets = compute_log_returns(&prices);
    assert_eq!(rets.n_rows(), prices.n_rows() - 1);

    let base = momentum(&prices, 20, 0.0);
    let gate = vol_regime_filter(&rets, 20, 0.02);
    let gated = apply_gate(&base, &gate);

    // gating can only flatten, never create exposure
    for (name, col) in gated.iter_columns() {
        let orig = base.column(name).unwrap();
        for (g, o) in col.iter().zip(orig) {
            assert!(g.is_flat() || g == o);
        }
    }
    // first price row has no gate reading
    assert!(gated.row(0).iter().all(|p| p.is_flat()));

    for positions in [&base, &gated] {
        let result = backtest_positions(&rets, positions, &BacktestConfig::with_cost_bps(2.0))
            .unwrap();
        assert_eq!(result.equity_curve().len(), rets.n_rows());
        assert_eq!(result.equity_curve().first(), Some(1.0));
        assert!(result.equity_curve().values().iter().all(|e| *e > 0.0));
    }
}

#[test]
fn mean_reversion_positions_are_ternary() {
    let pos = mean_reversion_zscore(&wave(200), 20, 1.0, 0.2);
    assert!(pos
        .iter_columns()
        .all(|(_, col)| col.iter().all(|p| [-1, 0, 1].contains(&p.value()))));
    assert!(pos.iter_columns().any(|(_, col)| col.contains(&Position::Short)));
}
