use crate::error::StageOutcome;
use crate::series::PriceSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

/// Fixed trailing window for both the moving average and the volatility.
pub const INDICATOR_WINDOW: usize = 7;

/// Rolling statistics for one ticker, aligned with the table's dates.
/// `None` marks a row where the trailing window is not yet fully populated.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub ma7: Vec<Option<f64>>,
    pub volatility: Vec<Option<f64>>,
}

/// Per-date rolling statistics for every ticker of the source series.
/// Derived once from an immutable [`PriceSeries`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, IndicatorColumn>,
}

impl IndicatorTable {
    pub fn from_series(series: &PriceSeries) -> Self {
        let mut columns = BTreeMap::new();
        for ticker in series.tickers() {
            let closes = series.column(ticker).unwrap_or(&[]);
            columns.insert(
                ticker.to_string(),
                IndicatorColumn {
                    ma7: rolling_mean(closes, INDICATOR_WINDOW),
                    volatility: rolling_return_std(closes, INDICATOR_WINDOW),
                },
            );
        }
        Self {
            dates: series.dates().to_vec(),
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column(&self, ticker: &str) -> Option<&IndicatorColumn> {
        self.columns.get(ticker)
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }
}

/// Indicator stage: 7-day trailing moving average and volatility per ticker.
pub fn compute_indicators(series: &PriceSeries) -> StageOutcome<IndicatorTable> {
    if series.is_empty() {
        info!("No data, nothing to compute");
        return StageOutcome::empty("no data to compute indicators from");
    }
    let table = IndicatorTable::from_series(series);
    info!(tickers = table.tickers().len(), "Indicators computed");
    StageOutcome::Success(table)
}

/// Trailing mean over `window` values, inclusive of the current row.
/// Defined only when every value in the window is present.
fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| {
            if t + 1 < window {
                return None;
            }
            let slice = &values[t + 1 - window..=t];
            if slice.iter().any(Option::is_none) {
                return None;
            }
            let sum: f64 = slice.iter().map(|v| v.unwrap_or(0.0)).sum();
            Some(sum / window as f64)
        })
        .collect()
}

/// Trailing sample standard deviation of the daily fractional returns.
///
/// The first return needs two closes, so the earliest defined row is one
/// past the earliest defined moving-average row.
fn rolling_return_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let returns: Vec<Option<f64>> = (0..values.len())
        .map(|t| {
            if t == 0 {
                return None;
            }
            match (values[t - 1], values[t]) {
                (Some(prev), Some(curr)) if prev != 0.0 => Some(curr / prev - 1.0),
                _ => None,
            }
        })
        .collect();

    (0..returns.len())
        .map(|t| {
            if t + 1 < window {
                return None;
            }
            let slice = &returns[t + 1 - window..=t];
            if slice.iter().any(Option::is_none) {
                return None;
            }
            let n = window as f64;
            let mean: f64 = slice.iter().map(|v| v.unwrap_or(0.0)).sum::<f64>() / n;
            let var: f64 = slice
                .iter()
                .map(|v| {
                    let r = v.unwrap_or(0.0) - mean;
                    r * r
                })
                .sum::<f64>()
                / (n - 1.0);
            Some(var.sqrt())
        })
        .collect()
}
