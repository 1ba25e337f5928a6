use crate::error::StageError;
use crate::movers::MovementRanking;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Stable artifact keys: repeated runs replace the previous artifact instead
/// of accumulating new ones.
pub const MOVERS_ARTIFACT_KEY: &str = "top-stock-movements";
pub const REPORT_ARTIFACT_KEY: &str = "daily-stock-report";

/// Tabular artifact payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableArtifact {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// External reporting surface: a tabular publish and a markdown publish,
/// both keyed. The transport behind it is not the pipeline's concern.
pub trait ArtifactSink: Send + Sync {
    fn publish_table(
        &self,
        key: &str,
        description: &str,
        table: &TableArtifact,
    ) -> Result<(), StageError>;

    fn publish_markdown(
        &self,
        key: &str,
        description: &str,
        markdown: &str,
    ) -> Result<(), StageError>;
}

/// Filesystem-backed sink: `{dir}/{key}.json` for tables, `{dir}/{key}.md`
/// for markdown. Same key, same file, full overwrite.
pub struct FileArtifactSink {
    dir: PathBuf,
}

impl FileArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, file_name: &str, content: &[u8]) -> Result<(), StageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, content)?;
        info!(path = %path.display(), "Artifact published");
        Ok(())
    }
}

#[derive(Serialize)]
struct TableEnvelope<'a> {
    key: &'a str,
    description: &'a str,
    #[serde(flatten)]
    table: &'a TableArtifact,
}

impl ArtifactSink for FileArtifactSink {
    fn publish_table(
        &self,
        key: &str,
        description: &str,
        table: &TableArtifact,
    ) -> Result<(), StageError> {
        let envelope = TableEnvelope {
            key,
            description,
            table,
        };
        let json = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| StageError::Publish(e.to_string()))?;
        self.write(&format!("{key}.json"), &json)
    }

    fn publish_markdown(
        &self,
        key: &str,
        _description: &str,
        markdown: &str,
    ) -> Result<(), StageError> {
        self.write(&format!("{key}.md"), markdown.as_bytes())
    }
}

/// Movers table in the shape the reporting surface expects:
/// one row per mover, gainers first.
pub fn movers_table(ranking: &MovementRanking) -> TableArtifact {
    TableArtifact {
        columns: vec![
            "Ticker".to_string(),
            "Variação (%)".to_string(),
            "Tipo".to_string(),
        ],
        rows: ranking
            .movers()
            .map(|m| {
                vec![
                    m.ticker.clone(),
                    format!("{:+.2}", m.percent_change),
                    m.direction.label().to_string(),
                ]
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movers::{Direction, Mover};
    use chrono::NaiveDate;

    fn sample_ranking() -> MovementRanking {
        MovementRanking {
            date: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
            gainers: vec![Mover {
                ticker: "AAA".to_string(),
                percent_change: 5.0,
                direction: Direction::Gain,
            }],
            losers: vec![Mover {
                ticker: "BBB".to_string(),
                percent_change: -5.0,
                direction: Direction::Loss,
            }],
        }
    }

    #[test]
    fn table_lists_gainers_before_losers() {
        let table = movers_table(&sample_ranking());
        assert_eq!(table.columns[0], "Ticker");
        assert_eq!(
            table.rows,
            vec![
                vec!["AAA".to_string(), "+5.00".to_string(), "Alta".to_string()],
                vec!["BBB".to_string(), "-5.00".to_string(), "Queda".to_string()],
            ]
        );
    }

    #[test]
    fn file_sink_replaces_artifact_under_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileArtifactSink::new(dir.path());

        sink.publish_markdown("daily-stock-report", "desc", "first run")
            .unwrap();
        sink.publish_markdown("daily-stock-report", "desc", "second run")
            .unwrap();

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let content = fs::read_to_string(dir.path().join("daily-stock-report.md")).unwrap();
        assert_eq!(content, "second run");
    }

    #[test]
    fn table_artifact_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileArtifactSink::new(dir.path());
        sink.publish_table("top-stock-movements", "desc", &movers_table(&sample_ranking()))
            .unwrap();

        let raw = fs::read_to_string(dir.path().join("top-stock-movements.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["key"], "top-stock-movements");
        assert_eq!(value["rows"][0][0], "AAA");
    }
}
