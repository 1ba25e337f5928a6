use crate::artifacts::{movers_table, ArtifactSink, MOVERS_ARTIFACT_KEY};
use crate::config::AppConfig;
use crate::error::StageOutcome;
use crate::fetch::fetch_price_series;
use crate::indicators::compute_indicators;
use crate::movers::{rank_movers, MovementRanking};
use crate::provider::PriceProvider;
use crate::report::{emit_report, ChartRenderer};
use crate::retry::RetryPolicy;
use crate::series::PriceSeries;
use crate::store::write_partitions;
use futures::future::join3;
use tracing::{info, instrument};

/// How one stage ended, for the run summary and the exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    /// Nothing to do; carries the reason.
    Skipped(String),
    /// Failed after the retry policy was exhausted.
    Failed(String),
}

impl StageStatus {
    fn from_outcome<T>(outcome: &StageOutcome<T>) -> Self {
        match outcome {
            StageOutcome::Success(_) => StageStatus::Succeeded,
            StageOutcome::Empty(reason) => StageStatus::Skipped(reason.clone()),
            StageOutcome::Failed(e) => StageStatus::Failed(e.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }
}

/// Per-stage outcome of one pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub fetch: StageStatus,
    pub indicators: StageStatus,
    pub partitions: StageStatus,
    pub analysis: StageStatus,
    pub report: StageStatus,
}

impl RunReport {
    /// A run without data is still a successful run; only an exhausted
    /// retry counts as failure.
    pub fn succeeded(&self) -> bool {
        self.stages().iter().all(|(_, status)| !status.is_failed())
    }

    pub fn stages(&self) -> [(&'static str, &StageStatus); 5] {
        [
            ("fetch", &self.fetch),
            ("indicators", &self.indicators),
            ("partition-write", &self.partitions),
            ("analyze", &self.analysis),
            ("report", &self.report),
        ]
    }
}

/// Sequences one daily pass: Fetch, then the three independent branches
/// (indicator computation, partition write, analyze-and-report) fanned out
/// over the shared immutable series.
///
/// Fetch is the hard prerequisite. When it ends empty or exhausted, the
/// downstream stages still run, observe the absent series and log their
/// no-op, so the run always reaches a terminal state.
pub struct Pipeline<P> {
    config: AppConfig,
    provider: P,
    renderer: Box<dyn ChartRenderer>,
    sink: Box<dyn ArtifactSink>,
    retry: RetryPolicy,
}

impl<P: PriceProvider> Pipeline<P> {
    pub fn new(
        config: AppConfig,
        provider: P,
        renderer: Box<dyn ChartRenderer>,
        sink: Box<dyn ArtifactSink>,
    ) -> Self {
        let retry = RetryPolicy::new(config.retry_max_attempts, config.retry_delay);
        Self {
            config,
            provider,
            renderer,
            sink,
            retry,
        }
    }

    /// One full pipeline pass.
    #[instrument(skip(self))]
    pub async fn run(&self) -> RunReport {
        let fetch_outcome = self
            .retry
            .run("fetch", || {
                fetch_price_series(
                    &self.provider,
                    &self.config.tickers,
                    self.config.lookback_days,
                )
            })
            .await;
        let fetch_status = StageStatus::from_outcome(&fetch_outcome);

        let series = match fetch_outcome {
            StageOutcome::Success(series) => series,
            _ => PriceSeries::default(),
        };

        let indicators = self
            .retry
            .run("indicators", || async { compute_indicators(&series) });
        let partitions = self.retry.run("partition-write", || async {
            write_partitions(&series, &self.config.base_dir)
        });
        let analyze_then_report = async {
            let analysis = self
                .retry
                .run("analyze", || async { self.analyze(&series) })
                .await;
            let ranking = match &analysis {
                StageOutcome::Success(ranking) => Some(ranking.clone()),
                _ => None,
            };
            let report = self
                .retry
                .run("report", || async {
                    emit_report(
                        &series,
                        ranking.as_ref(),
                        &self.config.base_dir,
                        self.renderer.as_ref(),
                        self.sink.as_ref(),
                    )
                })
                .await;
            (analysis, report)
        };

        let (indicators, partitions, (analysis, report)) =
            join3(indicators, partitions, analyze_then_report).await;

        let run_report = RunReport {
            fetch: fetch_status,
            indicators: StageStatus::from_outcome(&indicators),
            partitions: StageStatus::from_outcome(&partitions),
            analysis: StageStatus::from_outcome(&analysis),
            report: StageStatus::from_outcome(&report),
        };
        info!(succeeded = run_report.succeeded(), "Pipeline pass complete");
        run_report
    }

    /// Analyze stage: rank the movers and publish them as a table artifact
    /// under a stable key.
    fn analyze(&self, series: &PriceSeries) -> StageOutcome<MovementRanking> {
        match rank_movers(series) {
            StageOutcome::Success(ranking) => {
                if let Err(e) = self.sink.publish_table(
                    MOVERS_ARTIFACT_KEY,
                    "Top 3 altas e baixas do último dia.",
                    &movers_table(&ranking),
                ) {
                    return StageOutcome::Failed(e);
                }
                StageOutcome::Success(ranking)
            }
            StageOutcome::Empty(reason) => StageOutcome::Empty(reason),
            StageOutcome::Failed(e) => StageOutcome::Failed(e),
        }
    }
}
