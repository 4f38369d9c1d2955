//! Export daily Garmin Connect health metrics to Google Sheets or a CSV file.
//!
//! A run signs in to Garmin Connect for one profile, collects one
//! [`record::DailyRecord`] per day of the requested range and hands the
//! records to a [`sinks::Sink`].

pub mod cli;
pub mod config;
pub mod date_range;
pub mod domains;
pub mod error;
pub mod fetcher;
pub mod google_auth;
pub mod profile;
pub mod prompt;
pub mod record;
pub mod sinks;
pub mod sync;

mod test_utils;

pub use config::Settings;
pub use date_range::DateRange;
pub use error::{SyncError, SyncResult};
pub use profile::{Profile, Profiles};
pub use record::{DailyRecord, HEADERS};
pub use sinks::{CsvSink, OutputType, SheetsSink, Sink, SinkReport};
pub use sync::{SyncRequest, run_sync, sync_records};
