//! Error taxonomy.
//!
//! Per-record errors ([`RecordError`]) never stop ingestion; they are counted
//! by [`SkipReason`]. [`ScanFailure`] is fatal to one analytic job.

use std::fmt;
use std::path::PathBuf;

use holo_table::StoreError;
use thiserror::Error;

use crate::ingest::IngestSummary;

/// Why a record was classified as malformed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MalformedReason {
    /// Field count differs from the fixed schema width after reassembly.
    FieldCount,
    /// The reader could not decode the record (e.g. invalid UTF-8).
    Encoding,
    /// A numeric column did not parse under the `reject` policy.
    Numeric,
    /// The event date was unusable under the `skip` date policy.
    EventDate,
}

impl MalformedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MalformedReason::FieldCount => "field-count",
            MalformedReason::Encoding => "encoding",
            MalformedReason::Numeric => "numeric",
            MalformedReason::EventDate => "event-date",
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a well-formed record was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkippedReason {
    MissingIdentity,
}

impl fmt::Display for SkippedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkippedReason::MissingIdentity => f.write_str("missing-identity"),
        }
    }
}

/// Failure to turn one raw record into a stored row.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record ({reason}): {detail}")]
    MalformedRecord {
        reason: MalformedReason,
        detail: String,
    },

    #[error("skipped record ({reason})")]
    SkippedRecord { reason: SkippedReason },

    #[error("write failed for row {row_key}")]
    WriteFailure {
        row_key: String,
        #[source]
        source: StoreError,
    },
}

impl RecordError {
    pub fn malformed(reason: MalformedReason, detail: impl Into<String>) -> Self {
        Self::MalformedRecord {
            reason,
            detail: detail.into(),
        }
    }

    pub fn missing_identity() -> Self {
        Self::SkippedRecord {
            reason: SkippedReason::MissingIdentity,
        }
    }

    pub fn skip_reason(&self) -> SkipReason {
        match self {
            RecordError::MalformedRecord { reason, .. } => SkipReason::Malformed(*reason),
            RecordError::SkippedRecord { reason } => SkipReason::Skipped(*reason),
            RecordError::WriteFailure { .. } => SkipReason::WriteFailure,
        }
    }
}

/// Key of the per-reason counters in an ingestion summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    Malformed(MalformedReason),
    Skipped(SkippedReason),
    WriteFailure,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed(reason) => write!(f, "malformed/{reason}"),
            SkipReason::Skipped(reason) => write!(f, "skipped/{reason}"),
            SkipReason::WriteFailure => f.write_str("write-failure"),
        }
    }
}

/// Schema could not be ensured.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table {table} exists but lacks attribute groups {missing:?}")]
    MissingGroups { table: String, missing: Vec<String> },

    #[error("table {0} vanished while ensuring schema")]
    Vanished(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fatal ingestion error; carries what was ingested before the fault.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("schema check failed before ingestion")]
    Schema(#[from] SchemaError),

    #[error("input read failed after {} records", .summary.read)]
    Source {
        summary: IngestSummary,
        #[source]
        source: csv::Error,
    },

    #[error("open input {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A stored value of one row could not be interpreted; excludes only that row.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RowFault {
    #[error("attribute {attribute} is not a number: {value:?}")]
    InvalidNumber { attribute: &'static str, value: String },

    #[error("attribute {attribute} is not a date: {value:?}")]
    InvalidDate { attribute: &'static str, value: String },
}

/// The store could not produce the next row of a scan.
#[derive(Debug, Error)]
#[error("scan of table {table} failed after {rows_processed} rows")]
pub struct ScanFailure {
    pub table: String,
    pub rows_processed: u64,
    #[source]
    pub source: StoreError,
}

/// Report file could not be written.
#[derive(Debug, Error)]
#[error("write report {}", .path.display())]
pub struct ReportError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure of one analytic job (scan plus report).
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Scan(#[from] ScanFailure),

    #[error(transparent)]
    Report(#[from] ReportError),
}
