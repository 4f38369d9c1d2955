//! Output destinations for assembled records.

pub mod csv_file;
pub mod sheets;

use crate::error::SyncResult;
use crate::prompt::Prompter;
use crate::record::DailyRecord;
use async_trait::async_trait;
use std::fmt;

pub use csv_file::CsvSink;
pub use sheets::SheetsSink;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputType {
    #[default]
    Sheets,
    Csv,
}

impl OutputType {
    pub const ALL: [OutputType; 2] = [OutputType::Sheets, OutputType::Csv];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Sheets => "sheets",
            OutputType::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a sink did with the records it was given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub appended: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl fmt::Display for SinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} appended, {} updated, {} skipped",
            self.appended, self.updated, self.skipped
        )
    }
}

#[async_trait]
pub trait Sink: Send + Sync {
    /// Short description of the destination for log lines.
    fn describe(&self) -> String;

    /// Write `records` (ascending by date). Overwriting existing data is only
    /// done after `prompter` confirms it.
    async fn write(
        &self,
        records: &[DailyRecord],
        prompter: &mut dyn Prompter,
    ) -> SyncResult<SinkReport>;
}
