//! Tweet ingestion and scan analytics over a versioned `holo_table` store.
//!
//! CSV records are keyed by a normalized identity name plus event time,
//! split across the `identity`, `content` and `context` attribute groups,
//! and analysed with single ordered passes over the table.

pub mod account_age;
pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod record;
pub mod report;
pub mod row;
pub mod row_key;
pub mod scan;
pub mod schema;
pub mod versions;

pub use config::{AnalyticsConfig, IngestConfig, TableConfig, TweetsConfig};
pub use error::{IngestError, JobError, RecordError, ScanFailure, SchemaError, SkipReason};
pub use ingest::{IngestPipeline, IngestSummary};
pub use jobs::{Job, JobReport, JobRunner, JobSelection};
pub use report::{ReportLine, ReportWriter};
pub use row_key::{RowKey, RowKeySynthesizer};
pub use scan::{ScanEngine, ScanOutcome, ScanStats};
pub use schema::{EnsureOutcome, SchemaManager};
pub use versions::{Version, VersionReader};
