use crate::error::{StageError, StageOutcome};
use crate::provider::{PriceProvider, ProviderError};
use crate::series::PriceSeries;
use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, warn};

/// Resolve the fetch window: `lookback_days` back from `today`, inclusive.
pub fn fetch_window(today: NaiveDate, lookback_days: u32) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(i64::from(lookback_days)), today)
}

/// Fetch stage: request the trailing window from the provider and normalize
/// it into a [`PriceSeries`].
///
/// Provider outages never escape as raw errors: a no-data answer becomes an
/// `Empty` outcome, a transport fault becomes `Failed` so the coordinator's
/// retry layer can decide. The fetcher itself never retries.
pub async fn fetch_price_series<P>(
    provider: &P,
    tickers: &[String],
    lookback_days: u32,
) -> StageOutcome<PriceSeries>
where
    P: PriceProvider + ?Sized,
{
    let (start, end) = fetch_window(Utc::now().date_naive(), lookback_days);
    info!(%start, %end, tickers = tickers.len(), "Fetching daily close prices");

    match provider.daily_closes(tickers, start, end).await {
        Ok(observations) => {
            let series = PriceSeries::from_observations(observations);
            if series.is_empty() {
                info!("Provider returned no usable observations for the window");
                return StageOutcome::empty("no usable observations in window");
            }
            info!(
                valid_tickers = series.ticker_count(),
                dates = series.len(),
                "Fetched close prices"
            );
            StageOutcome::Success(series)
        }
        Err(ProviderError::NoData) => {
            info!("No close-price data available from provider");
            StageOutcome::empty("provider signaled no data")
        }
        Err(e) => {
            warn!(error = %e, "Provider request failed");
            StageOutcome::Failed(StageError::TransientIo(e.to_string()))
        }
    }
}
