use crate::error::StageOutcome;
use crate::series::PriceSeries;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::info;

/// How many movers each side of the ranking keeps.
pub const TOP_N: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Gain,
    Loss,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Gain => "Alta",
            Direction::Loss => "Queda",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub ticker: String,
    pub percent_change: f64,
    pub direction: Direction,
}

/// Ranked day-over-day movers for the latest date of a series.
///
/// Gainers hold the tickers with the largest positive changes (descending),
/// losers the largest negative ones (most negative first); a flat ticker
/// appears in neither list, so the two lists are always disjoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementRanking {
    pub date: NaiveDate,
    pub gainers: Vec<Mover>,
    pub losers: Vec<Mover>,
}

impl MovementRanking {
    pub fn movers(&self) -> impl Iterator<Item = &Mover> {
        self.gainers.iter().chain(self.losers.iter())
    }
}

/// Analyze stage: percent change of the last two rows per ticker, top-3 each
/// way. Empty when fewer than two dates are available or no ticker moved.
pub fn rank_movers(series: &PriceSeries) -> StageOutcome<MovementRanking> {
    if series.is_empty() {
        info!("No data to analyze");
        return StageOutcome::empty("no data to analyze");
    }
    if series.len() < 2 {
        info!("Only one date in window, no day-over-day change");
        return StageOutcome::empty("fewer than two dates in window");
    }
    let Some(date) = series.latest_date() else {
        return StageOutcome::empty("no dates in window");
    };

    let last = series.len() - 1;
    let mut changes: Vec<(String, f64)> = Vec::new();
    for ticker in series.tickers() {
        // Both closes must be present for a defined change.
        if let (Some(prev), Some(curr)) = (series.close(ticker, last - 1), series.close(ticker, last))
        {
            if prev != 0.0 {
                changes.push((ticker.to_string(), (curr / prev - 1.0) * 100.0));
            }
        }
    }
    if changes.is_empty() {
        info!("No day-over-day changes could be computed");
        return StageOutcome::empty("latest-date change vector is empty");
    }

    let gainers = take_ranked(
        changes.iter().filter(|(_, pct)| *pct > 0.0),
        Direction::Gain,
    );
    let losers = take_ranked(
        changes.iter().filter(|(_, pct)| *pct < 0.0),
        Direction::Loss,
    );
    if gainers.is_empty() && losers.is_empty() {
        info!("Every ticker was flat on the latest date");
        return StageOutcome::empty("no movers on latest date");
    }

    let ranking = MovementRanking {
        date,
        gainers,
        losers,
    };
    info!(
        date = %ranking.date,
        gainers = ranking.gainers.len(),
        losers = ranking.losers.len(),
        "Movement ranking computed"
    );
    StageOutcome::Success(ranking)
}

/// Sort by magnitude for the given direction, break ties by ticker symbol
/// ascending for determinism, keep the top 3.
fn take_ranked<'a>(
    changes: impl Iterator<Item = &'a (String, f64)>,
    direction: Direction,
) -> Vec<Mover> {
    let mut selected: Vec<&(String, f64)> = changes.collect();
    selected.sort_by(|a, b| {
        let by_value = match direction {
            Direction::Gain => b.1.partial_cmp(&a.1),
            Direction::Loss => a.1.partial_cmp(&b.1),
        };
        by_value.unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
    });
    selected
        .into_iter()
        .take(TOP_N)
        .map(|(ticker, pct)| Mover {
            ticker: ticker.clone(),
            percent_change: *pct,
            direction,
        })
        .collect()
}
