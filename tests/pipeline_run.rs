//! End-to-end pass over a synthetic eight-day window: AAA rises 5% on the
//! last day, BBB falls 5%, CCC stays flat.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use marketpulse::artifacts::FileArtifactSink;
use marketpulse::config::AppConfig;
use marketpulse::indicators::IndicatorTable;
use marketpulse::pipeline::{Pipeline, StageStatus};
use marketpulse::provider::{PriceProvider, ProviderError};
use marketpulse::report::PngChartRenderer;
use marketpulse::series::{CloseObservation, PriceSeries};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const DAYS: usize = 8;

fn synthetic_closes() -> Vec<(&'static str, Vec<f64>)> {
    let flat = |value: f64| vec![value; DAYS];
    let mut aaa = flat(100.0);
    aaa[DAYS - 1] = 105.0;
    let mut bbb = flat(200.0);
    bbb[DAYS - 1] = 190.0;
    let ccc = flat(50.0);
    vec![("AAA", aaa), ("BBB", bbb), ("CCC", ccc)]
}

fn synthetic_observations() -> Vec<CloseObservation> {
    let today = Utc::now().date_naive();
    let first = today - Duration::days(DAYS as i64 - 1);
    let mut observations = Vec::new();
    for (ticker, closes) in synthetic_closes() {
        for (i, close) in closes.into_iter().enumerate() {
            observations.push(CloseObservation {
                ticker: ticker.to_string(),
                date: first + Duration::days(i as i64),
                close,
            });
        }
    }
    observations
}

struct SyntheticProvider;

#[async_trait]
impl PriceProvider for SyntheticProvider {
    async fn daily_closes(
        &self,
        _tickers: &[String],
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<CloseObservation>, ProviderError> {
        Ok(synthetic_observations())
    }
}

fn test_config(base_dir: &Path) -> AppConfig {
    AppConfig {
        tickers: Arc::new(vec![
            "AAA".to_string(),
            "BBB".to_string(),
            "CCC".to_string(),
        ]),
        api_key: "test-key".to_string(),
        provider_url: "http://localhost".to_string(),
        base_dir: base_dir.to_path_buf(),
        lookback_days: 10,
        retry_max_attempts: 3,
        retry_delay: std::time::Duration::ZERO,
    }
}

#[tokio::test]
async fn daily_pass_over_eight_synthetic_days() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileArtifactSink::new(dir.path().join("artifacts"));
    let pipeline = Pipeline::new(
        test_config(dir.path()),
        SyntheticProvider,
        Box::new(PngChartRenderer::default()),
        Box::new(sink),
    );

    let report = pipeline.run().await;
    assert!(report.succeeded(), "run failed: {report:?}");
    for (stage, status) in report.stages() {
        assert_eq!(*status, StageStatus::Succeeded, "stage {stage}");
    }

    // One partition file per fetched date, grouped by month.
    let series = PriceSeries::from_observations(synthetic_observations());
    assert_eq!(series.len(), DAYS);
    for date in series.dates() {
        let path = dir
            .path()
            .join(date.format("%Y-%m").to_string())
            .join(format!("{}.csv", date.format("%Y-%m-%d")));
        assert!(path.exists(), "missing partition {}", path.display());
    }

    // Latest partition holds the cross-sectional closes.
    let last = series.dates().last().unwrap();
    let content = fs::read_to_string(
        dir.path()
            .join(last.format("%Y-%m").to_string())
            .join(format!("{}.csv", last.format("%Y-%m-%d"))),
    )
    .unwrap();
    assert!(content.starts_with("date,AAA,BBB,CCC\n"));
    assert!(content.contains(",105,190,50"));

    // Rendered chart is overwritten in place under the base dir.
    let chart = dir.path().join("relatorio.png");
    assert!(chart.exists());
    assert!(fs::metadata(&chart).unwrap().len() > 0);

    // Movers table: AAA gains about +5, BBB loses about -5, CCC nowhere.
    let table = fs::read_to_string(
        dir.path()
            .join("artifacts")
            .join("top-stock-movements.json"),
    )
    .unwrap();
    let table: serde_json::Value = serde_json::from_str(&table).unwrap();
    let rows = table["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "AAA");
    assert_eq!(rows[0][1], "+5.00");
    assert_eq!(rows[0][2], "Alta");
    assert_eq!(rows[1][0], "BBB");
    assert_eq!(rows[1][1], "-5.00");
    assert_eq!(rows[1][2], "Queda");
    assert!(!table.to_string().contains("CCC"));

    // Markdown report references the chart and embeds the movers.
    let markdown = fs::read_to_string(
        dir.path().join("artifacts").join("daily-stock-report.md"),
    )
    .unwrap();
    assert!(markdown.contains("relatorio.png"));
    assert!(markdown.contains("| AAA | +5.00 | Alta |"));

    // Moving average is defined for days 7 and 8 only.
    let indicators = IndicatorTable::from_series(&series);
    let aaa = indicators.column("AAA").unwrap();
    for t in 0..6 {
        assert!(aaa.ma7[t].is_none());
    }
    assert!(aaa.ma7[6].is_some());
    assert!(aaa.ma7[7].is_some());
}

#[tokio::test]
async fn rerun_for_the_same_dates_overwrites_partitions() {
    let dir = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        let sink = FileArtifactSink::new(dir.path().join("artifacts"));
        let pipeline = Pipeline::new(
            test_config(dir.path()),
            SyntheticProvider,
            Box::new(PngChartRenderer::default()),
            Box::new(sink),
        );
        assert!(pipeline.run().await.succeeded());
    }

    // Still exactly one file per date.
    let mut partition_files = 0;
    for entry in fs::read_dir(dir.path()).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_dir() && entry.file_name() != "artifacts" {
            partition_files += fs::read_dir(entry.path()).unwrap().count();
        }
    }
    assert_eq!(partition_files, DAYS);
}
