use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// A single (ticker, date, close) observation as returned by a price provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseObservation {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
}

/// Cross-sectional close-price table: one row per date, one column per ticker.
///
/// Invariants held by construction:
/// - dates are strictly increasing;
/// - every column has exactly `dates.len()` entries (`None` marks a missing
///   observation for that date);
/// - a ticker with zero valid observations over the window is dropped entirely.
///
/// Immutable once produced; every downstream stage reads the same instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl PriceSeries {
    /// Build a series from raw provider observations.
    ///
    /// Non-finite closes are discarded before alignment; when several
    /// observations land on the same (ticker, date) cell the last one wins.
    pub fn from_observations(observations: Vec<CloseObservation>) -> Self {
        let mut date_set: BTreeSet<NaiveDate> = BTreeSet::new();
        for obs in &observations {
            if obs.close.is_finite() {
                date_set.insert(obs.date);
            }
        }
        let dates: Vec<NaiveDate> = date_set.into_iter().collect();
        let index: BTreeMap<NaiveDate, usize> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, i))
            .collect();

        let mut columns: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
        for obs in observations {
            if !obs.close.is_finite() {
                continue;
            }
            let column = columns
                .entry(obs.ticker)
                .or_insert_with(|| vec![None; dates.len()]);
            column[index[&obs.date]] = Some(obs.close);
        }

        // Drop tickers with no valid observation anywhere in the window.
        columns.retain(|_, values| values.iter().any(Option::is_some));

        Self { dates, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.columns.is_empty()
    }

    /// Number of dates (rows) in the window.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Ticker symbols in lexical order.
    pub fn tickers(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn ticker_count(&self) -> usize {
        self.columns.len()
    }

    /// Full close column for one ticker, aligned with `dates()`.
    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.columns.get(ticker).map(Vec::as_slice)
    }

    pub fn close(&self, ticker: &str, row: usize) -> Option<f64> {
        self.columns.get(ticker).and_then(|c| c.get(row).copied().flatten())
    }

    /// One date's cross-sectional row, tickers in lexical order.
    pub fn row(&self, row: usize) -> Vec<(&str, Option<f64>)> {
        self.columns
            .iter()
            .map(|(ticker, values)| (ticker.as_str(), values.get(row).copied().flatten()))
            .collect()
    }

    /// New series holding only the last `n` dates (all of them when the
    /// window is shorter than `n`).
    pub fn trailing(&self, n: usize) -> PriceSeries {
        let skip = self.dates.len().saturating_sub(n);
        PriceSeries {
            dates: self.dates[skip..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(t, v)| (t.clone(), v[skip..].to_vec()))
                .collect(),
        }
    }
}
