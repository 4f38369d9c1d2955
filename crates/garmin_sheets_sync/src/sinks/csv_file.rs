use super::{Sink, SinkReport};
use crate::error::{SyncError, SyncResult};
use crate::prompt::Prompter;
use crate::record::{DailyRecord, HEADERS};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes a fresh CSV file: header row then one row per record.
#[derive(Clone, Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode header and rows in memory.
    pub fn render(records: &[DailyRecord]) -> SyncResult<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(HEADERS)?;
        for record in records {
            wtr.write_record(record.to_row().iter().map(|c| c.to_string()))?;
        }
        wtr.into_inner()
            .map_err(|e| SyncError::Io(e.into_error()))
    }

    async fn has_content(&self) -> SyncResult<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Sink for CsvSink {
    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }

    async fn write(
        &self,
        records: &[DailyRecord],
        prompter: &mut dyn Prompter,
    ) -> SyncResult<SinkReport> {
        if self.has_content().await? {
            let question = format!("{} already exists. Overwrite it?", self.path.display());
            if !prompter.confirm(&question, false).await? {
                return Err(SyncError::OverwriteDeclined(self.path.display().to_string()));
            }
        }

        let body = Self::render(records)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, body).await?;
        tracing::info!(path = %self.path.display(), rows = records.len(), "wrote csv file");

        Ok(SinkReport {
            appended: records.len(),
            ..SinkReport::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn render_quotes_and_blanks() {
        let mut record = DailyRecord::blank(NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"));
        record.training.status = Some("PRODUCTIVE, peaking".into());
        let out = String::from_utf8(CsvSink::render(&[record]).expect("render")).expect("utf8");
        let mut lines = out.lines();
        assert!(lines.next().expect("header").starts_with("Date,Sleep Score,Sleep Length"));
        let row = lines.next().expect("row");
        assert!(row.starts_with("2025-03-01,,,"));
        assert!(row.contains("\"PRODUCTIVE, peaking\""));
        assert!(lines.next().is_none());
    }
}
