use crate::error::{StageError, StageOutcome};
use crate::series::PriceSeries;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Persists one CSV file per date under `{base}/{YYYY-MM}/{YYYY-MM-DD}.csv`.
///
/// Writes are full overwrites (idempotent per date, last writer wins) and
/// atomic per file: content goes to a temp file in the target directory and
/// is renamed into place, so a crash never leaves a half-written partition.
pub struct PartitionWriter {
    base_dir: PathBuf,
}

impl PartitionWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Partition path is a pure function of the date.
    pub fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.base_dir
            .join(date.format("%Y-%m").to_string())
            .join(format!("{}.csv", date.format("%Y-%m-%d")))
    }

    /// Write every date of the series to its partition file.
    ///
    /// A filesystem error aborts the loop and surfaces to the retry layer;
    /// partitions already written stay on disk (no cross-date rollback).
    pub fn write_all(&self, series: &PriceSeries) -> StageOutcome<usize> {
        if series.is_empty() {
            warn!("No data to save");
            return StageOutcome::empty("no data to partition");
        }

        for (row, date) in series.dates().iter().enumerate() {
            if let Err(e) = self.write_partition(series, row, *date) {
                return StageOutcome::Failed(e);
            }
        }

        info!(partitions = series.len(), base = %self.base_dir.display(), "Partitions written");
        StageOutcome::Success(series.len())
    }

    fn write_partition(
        &self,
        series: &PriceSeries,
        row: usize,
        date: NaiveDate,
    ) -> Result<(), StageError> {
        let path = self.partition_path(date);
        let dir = path
            .parent()
            .ok_or_else(|| StageError::TransientIo(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        write_cross_section(&mut tmp, series, row, date)?;
        tmp.persist(&path)
            .map_err(|e| StageError::TransientIo(e.to_string()))?;

        debug!(%date, path = %path.display(), "Partition written");
        Ok(())
    }
}

/// One date's cross-sectional row as CSV: a header with the ticker columns
/// and a single data row. Missing closes serialize as empty fields.
fn write_cross_section<W: std::io::Write>(
    out: &mut W,
    series: &PriceSeries,
    row: usize,
    date: NaiveDate,
) -> Result<(), StageError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["date".to_string()];
    header.extend(series.tickers().iter().map(|t| t.to_string()));
    writer.write_record(&header)?;

    let mut record = vec![date.format("%Y-%m-%d").to_string()];
    for (_, close) in series.row(row) {
        record.push(close.map(|c| c.to_string()).unwrap_or_default());
    }
    writer.write_record(&record)?;
    writer.flush().map_err(StageError::from)?;
    Ok(())
}

/// Store stage entry point.
pub fn write_partitions(series: &PriceSeries, base_dir: &Path) -> StageOutcome<usize> {
    PartitionWriter::new(base_dir).write_all(series)
}
