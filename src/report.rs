use crate::artifacts::{ArtifactSink, REPORT_ARTIFACT_KEY};
use crate::error::{StageError, StageOutcome};
use crate::movers::MovementRanking;
use crate::series::PriceSeries;
use chrono::{NaiveDate, Utc};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The chart always shows the trailing 30 observations.
pub const CHART_WINDOW: usize = 30;
/// Fixed chart file name under the base directory, overwritten each run.
pub const CHART_FILE_NAME: &str = "relatorio.png";

/// Narrow seam to the charting backend; the pipeline only needs "draw this
/// series to that file".
pub trait ChartRenderer: Send + Sync {
    fn render(&self, series: &PriceSeries, path: &Path) -> Result<(), StageError>;
}

/// Bitmap line chart, one series per ticker.
///
/// Text layers are deliberately left out so the backend stays free of any
/// system font dependency; the surrounding markdown carries the labels.
pub struct PngChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PngChartRenderer {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
        }
    }
}

fn draw_err(e: impl std::fmt::Display) -> StageError {
    StageError::Render(e.to_string())
}

impl ChartRenderer for PngChartRenderer {
    fn render(&self, series: &PriceSeries, path: &Path) -> Result<(), StageError> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for ticker in series.tickers() {
            for close in series.column(ticker).unwrap_or(&[]).iter().flatten() {
                min = min.min(*close);
                max = max.max(*close);
            }
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(StageError::Render("no values to plot".to_string()));
        }
        if min == max {
            // Flat series still need a non-degenerate axis.
            min -= 1.0;
            max += 1.0;
        }

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0..series.len().max(1), min..max)
            .map_err(draw_err)?;

        for (idx, ticker) in series.tickers().into_iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            let points: Vec<(usize, f64)> = series
                .column(ticker)
                .unwrap_or(&[])
                .iter()
                .enumerate()
                .filter_map(|(i, close)| close.map(|c| (i, c)))
                .collect();
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
        Ok(())
    }
}

/// Daily markdown summary referencing the chart and embedding the ranked
/// movers.
pub fn compose_markdown(
    date: NaiveDate,
    chart_path: &Path,
    ranking: &MovementRanking,
) -> String {
    let mut markdown = String::from("## 📊 Relatório Diário das Ações\n\n");
    markdown.push_str(&format!(
        "- **Data do relatório:** {}\n",
        date.format("%Y-%m-%d")
    ));

    markdown.push_str("- **Top 3 Altas e Quedas:**\n\n");
    markdown.push_str("| Ticker | Variação (%) | Tipo |\n");
    markdown.push_str("|--------|--------------|------|\n");
    for mover in ranking.movers() {
        markdown.push_str(&format!(
            "| {} | {:+.2} | {} |\n",
            mover.ticker,
            mover.percent_change,
            mover.direction.label()
        ));
    }

    markdown.push_str(&format!(
        "\n![Relatório](attachment://{})\n",
        chart_path.display()
    ));
    markdown
}

/// Report stage: render the trailing-window chart and publish the markdown
/// summary embedding the ranking. Presentation only; no numeric computation
/// beyond slicing.
///
/// With no ranking there is nothing to summarize (a single-date window, say)
/// and the stage skips without publishing anything.
pub fn emit_report(
    series: &PriceSeries,
    ranking: Option<&MovementRanking>,
    base_dir: &Path,
    renderer: &dyn ChartRenderer,
    sink: &dyn ArtifactSink,
) -> StageOutcome<PathBuf> {
    if series.is_empty() {
        info!("No data for report");
        return StageOutcome::empty("no data for report");
    }
    let Some(ranking) = ranking else {
        info!("No movement ranking, skipping report");
        return StageOutcome::empty("no movement ranking to report");
    };

    let chart_path = base_dir.join(CHART_FILE_NAME);
    if let Err(e) = fs::create_dir_all(base_dir) {
        return StageOutcome::Failed(e.into());
    }
    if let Err(e) = renderer.render(&series.trailing(CHART_WINDOW), &chart_path) {
        return StageOutcome::Failed(e);
    }

    let markdown = compose_markdown(Utc::now().date_naive(), &chart_path, ranking);

    if let Err(e) = sink.publish_markdown(
        REPORT_ARTIFACT_KEY,
        "Relatório de análise das ações com gráfico.",
        &markdown,
    ) {
        return StageOutcome::Failed(e);
    }

    info!(chart = %chart_path.display(), "Report published");
    StageOutcome::Success(chart_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::TableArtifact;
    use crate::movers::{Direction, Mover};
    use crate::series::CloseObservation;
    use std::sync::Mutex;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct RecordingSink {
        markdown: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                markdown: Mutex::new(Vec::new()),
            }
        }
    }

    impl ArtifactSink for RecordingSink {
        fn publish_table(
            &self,
            _key: &str,
            _description: &str,
            _table: &TableArtifact,
        ) -> Result<(), StageError> {
            Ok(())
        }

        fn publish_markdown(
            &self,
            key: &str,
            _description: &str,
            markdown: &str,
        ) -> Result<(), StageError> {
            self.markdown
                .lock()
                .unwrap()
                .push((key.to_string(), markdown.to_string()));
            Ok(())
        }
    }

    struct NoopRenderer;

    impl ChartRenderer for NoopRenderer {
        fn render(&self, _series: &PriceSeries, path: &Path) -> Result<(), StageError> {
            fs::write(path, b"png").map_err(StageError::from)
        }
    }

    fn sample_ranking() -> MovementRanking {
        MovementRanking {
            date: d("2025-03-07"),
            gainers: vec![Mover {
                ticker: "AAA".to_string(),
                percent_change: 5.0,
                direction: Direction::Gain,
            }],
            losers: vec![],
        }
    }

    #[test]
    fn markdown_embeds_movers_and_chart_reference() {
        let ranking = sample_ranking();
        let markdown = compose_markdown(
            d("2025-03-07"),
            Path::new("dados_mercado/relatorio.png"),
            &ranking,
        );
        assert!(markdown.contains("**Data do relatório:** 2025-03-07"));
        assert!(markdown.contains("| AAA | +5.00 | Alta |"));
        assert!(markdown.contains("attachment://dados_mercado/relatorio.png"));
    }

    #[test]
    fn emit_writes_chart_and_publishes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let series = PriceSeries::from_observations(vec![CloseObservation {
            ticker: "AAA".to_string(),
            date: d("2025-03-07"),
            close: 10.0,
        }]);
        let sink = RecordingSink::new();
        let ranking = sample_ranking();

        let outcome = emit_report(&series, Some(&ranking), dir.path(), &NoopRenderer, &sink);
        assert!(outcome.is_success());
        assert!(dir.path().join(CHART_FILE_NAME).exists());

        let published = sink.markdown.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, REPORT_ARTIFACT_KEY);
    }

    #[test]
    fn emit_without_ranking_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let series = PriceSeries::from_observations(vec![CloseObservation {
            ticker: "AAA".to_string(),
            date: d("2025-03-07"),
            close: 10.0,
        }]);
        let sink = RecordingSink::new();

        let outcome = emit_report(&series, None, dir.path(), &NoopRenderer, &sink);
        assert!(outcome.is_empty());
        assert!(!dir.path().join(CHART_FILE_NAME).exists());
        assert!(sink.markdown.lock().unwrap().is_empty());
    }

    #[test]
    fn emit_on_empty_series_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::new();
        let ranking = sample_ranking();
        let outcome = emit_report(
            &PriceSeries::default(),
            Some(&ranking),
            dir.path(),
            &NoopRenderer,
            &sink,
        );
        assert!(outcome.is_empty());
        assert!(!dir.path().join(CHART_FILE_NAME).exists());
    }
}
