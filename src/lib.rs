//! Daily equity movers pipeline.
//!
//! One pass fetches close prices for a configured ticker set, derives rolling
//! indicators, persists date-partitioned snapshots, ranks the day's biggest
//! movers and publishes a rendered summary. The pipeline is a best-effort
//! batch job: each stage is wrapped in a bounded retry policy, and a day
//! without usable data degrades to logged no-ops instead of a failed run.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod fetch;
pub mod indicators;
pub mod movers;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod retry;
pub mod series;
pub mod store;

pub use config::AppConfig;
pub use error::{StageError, StageOutcome};
pub use pipeline::{Pipeline, RunReport, StageStatus};
pub use series::{CloseObservation, PriceSeries};
