//! Experiment configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! symbols = ["SPY"]
//! start = "2015-01-01"
//! field = "Adj Close"
//! interval = "1d"
//! cache_dir = "data/raw"
//!
//! [strategy]
//! type = "vol_filtered_momentum"
//! lookback = 60
//! vol_lookback = 20
//! vol_threshold = 0.02
//!
//! [backtest]
//! transaction_cost_bps = 2.0
//! alignment = "pad_with_zero"
//!
//! [metrics]
//! risk_free_rate = 0.0
//! periods_per_year = 252
//! ```
//!
//! Every section and field is optional; omitted values take the defaults shown.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use siglab_core::data::{Interval, PriceField, PriceQuery};
use siglab_core::{AlignmentPolicy, BacktestConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metrics::MetricsSettings;

/// Unique identifier for an experiment (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which prices to load and where to cache them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    /// `None` = up to today.
    pub end: Option<NaiveDate>,
    pub field: PriceField,
    pub interval: Interval,
    pub cache_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["SPY".to_string()],
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end: None,
            field: PriceField::AdjClose,
            interval: Interval::Daily,
            cache_dir: PathBuf::from("data/raw"),
        }
    }
}

impl DataConfig {
    pub fn price_query(&self) -> PriceQuery {
        PriceQuery {
            symbols: self.symbols.clone(),
            start: self.start,
            end: self.end,
            field: self.field,
            interval: self.interval,
        }
    }
}

/// Strategy configuration (serializable enum).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Sign of the lookback return against ±threshold.
    Momentum {
        lookback: usize,
        #[serde(default)]
        threshold: f64,
    },

    /// Fade z-score extremes with an entry/exit hysteresis band.
    MeanReversion {
        lookback: usize,
        entry_z: f64,
        exit_z: f64,
    },

    /// Momentum flattened whenever rolling volatility exceeds a ceiling.
    VolFilteredMomentum {
        lookback: usize,
        #[serde(default)]
        threshold: f64,
        vol_lookback: usize,
        vol_threshold: f64,
    },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::Momentum {
            lookback: 20,
            threshold: 0.0,
        }
    }
}

impl StrategyConfig {
    /// Display label, e.g. `Momentum (20)`.
    pub fn label(&self) -> String {
        match self {
            StrategyConfig::Momentum { lookback, .. } => format!("Momentum ({lookback})"),
            StrategyConfig::MeanReversion {
                lookback,
                entry_z,
                exit_z,
            } => format!("Mean Reversion ({lookback}, {entry_z}/{exit_z})"),
            StrategyConfig::VolFilteredMomentum {
                lookback,
                vol_lookback,
                vol_threshold,
                ..
            } => format!(
                "Vol-Filtered Momentum ({lookback}, vol {vol_lookback} <= {vol_threshold})"
            ),
        }
    }

    /// Rows of history consumed before the strategy can take a position.
    pub fn warmup(&self) -> usize {
        match *self {
            StrategyConfig::Momentum { lookback, .. } => lookback,
            StrategyConfig::MeanReversion { lookback, .. } => lookback.saturating_sub(1),
            StrategyConfig::VolFilteredMomentum {
                lookback,
                vol_lookback,
                ..
            } => lookback.max(vol_lookback),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let check_lookback = |name: &str, v: usize| {
            if v == 0 {
                Err(ConfigError::Invalid(format!("{name} must be >= 1")))
            } else {
                Ok(())
            }
        };
        match *self {
            StrategyConfig::Momentum {
                lookback,
                threshold,
            } => {
                check_lookback("lookback", lookback)?;
                check_non_negative("threshold", threshold)
            }
            StrategyConfig::MeanReversion {
                lookback,
                entry_z,
                exit_z,
            } => {
                check_lookback("lookback", lookback)?;
                check_non_negative("entry_z", entry_z)?;
                check_non_negative("exit_z", exit_z)
            }
            StrategyConfig::VolFilteredMomentum {
                lookback,
                threshold,
                vol_lookback,
                vol_threshold,
            } => {
                check_lookback("lookback", lookback)?;
                check_lookback("vol_lookback", vol_lookback)?;
                check_non_negative("threshold", threshold)?;
                check_non_negative("vol_threshold", vol_threshold)
            }
        }
    }
}

fn check_non_negative(name: &str, v: f64) -> Result<(), ConfigError> {
    if v >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be >= 0, got {v}")))
    }
}

/// `[backtest]` section. Cost defaults to 2 bps per unit of turnover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub transaction_cost_bps: f64,
    pub alignment: AlignmentPolicy,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            transaction_cost_bps: 2.0,
            alignment: AlignmentPolicy::PadWithZero,
        }
    }
}

impl BacktestSettings {
    pub fn engine_config(&self) -> BacktestConfig {
        BacktestConfig {
            transaction_cost_bps: self.transaction_cost_bps,
            alignment: self.alignment,
        }
    }
}

/// A complete, reproducible experiment description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    pub strategy: StrategyConfig,
    pub backtest: BacktestSettings,
    pub metrics: MetricsSettings,
}

impl ExperimentConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.symbols.is_empty() {
            return Err(ConfigError::Invalid("data.symbols must not be empty".into()));
        }
        if let Some(end) = self.data.end {
            if end < self.data.start {
                return Err(ConfigError::Invalid(format!(
                    "data.end ({end}) is before data.start ({})",
                    self.data.start
                )));
            }
        }
        self.strategy.validate()?;
        check_non_negative("transaction_cost_bps", self.backtest.transaction_cost_bps)?;
        if !(self.metrics.periods_per_year > 0.0) {
            return Err(ConfigError::Invalid(
                "metrics.periods_per_year must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Deterministic hash ID for this configuration.
    ///
    /// Two experiments with identical configs share the same `RunId`.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_research_defaults() {
        let config = ExperimentConfig::from_toml_str("").unwrap();
        assert_eq!(config.data.symbols, vec!["SPY".to_string()]);
        assert_eq!(config.data.start, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(config.data.field, PriceField::AdjClose);
        assert_eq!(config.data.interval, Interval::Daily);
        assert_eq!(config.data.cache_dir, PathBuf::from("data/raw"));
        assert_eq!(config.backtest.transaction_cost_bps, 2.0);
        assert_eq!(config.metrics.periods_per_year, 252.0);
        assert_eq!(config.strategy, StrategyConfig::default());
    }

    #[test]
    fn parses_full_file() {
        let toml = r#"
            [data]
            symbols = ["SPY", "QQQ"]
            start = "2018-06-01"
            end = "2023-12-29"
            field = "Close"
            interval = "1wk"

            [strategy]
            type = "mean_reversion"
            lookback = 20
            entry_z = 1.5
            exit_z = 0.25

            [backtest]
            transaction_cost_bps = 5.0
            alignment = "strict"

            [metrics]
            risk_free_rate = 0.02
            periods_per_year = 52
        "#;
        let config = ExperimentConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.data.symbols.len(), 2);
        assert_eq!(config.data.end, NaiveDate::from_ymd_opt(2023, 12, 29));
        assert_eq!(config.data.field, PriceField::Close);
        assert_eq!(config.data.interval, Interval::Weekly);
        assert_eq!(
            config.strategy,
            StrategyConfig::MeanReversion {
                lookback: 20,
                entry_z: 1.5,
                exit_z: 0.25
            }
        );
        assert_eq!(config.backtest.alignment, AlignmentPolicy::Strict);
        assert_eq!(config.metrics.risk_free_rate, 0.02);
        assert_eq!(config.metrics.periods_per_year, 52.0);
    }

    #[test]
    fn rejects_zero_lookback() {
        let err = ExperimentConfig::from_toml_str("[strategy]\ntype = \"momentum\"\nlookback = 0\n")
            .unwrap_err();
        assert!(err.to_string().contains("lookback must be >= 1"));
    }

    #[test]
    fn rejects_end_before_start() {
        let toml = "[data]\nstart = \"2020-01-01\"\nend = \"2019-01-01\"\n";
        assert!(matches!(
            ExperimentConfig::from_toml_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let toml = "[strategy]\ntype = \"pairs\"\nlookback = 5\n";
        assert!(matches!(
            ExperimentConfig::from_toml_str(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn run_id_is_deterministic() {
        let a = ExperimentConfig::default();
        let mut b = ExperimentConfig::default();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        b.backtest.transaction_cost_bps = 3.0;
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);
    }

    #[test]
    fn warmup_covers_longest_window() {
        let s = StrategyConfig::VolFilteredMomentum {
            lookback: 60,
            threshold: 0.0,
            vol_lookback: 120,
            vol_threshold: 0.02,
        };
        assert_eq!(s.warmup(), 120);
        assert_eq!(
            StrategyConfig::MeanReversion {
                lookback: 20,
                entry_z: 1.0,
                exit_z: 0.2
            }
            .warmup(),
            19
        );
    }

    #[test]
    fn price_query_mirrors_data_section() {
        let q = DataConfig::default().price_query();
        assert_eq!(q.symbols, vec!["SPY".to_string()]);
        assert_eq!(q.end, None);
        assert_eq!(q.field, PriceField::AdjClose);
    }
}
