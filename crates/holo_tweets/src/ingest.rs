//! Record-at-a-time ingestion of tweet CSV into the versioned store.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use holo_table::{ColumnWrite, TableStore};

use crate::config::{DateFallback, IngestConfig, NumericPolicy, TableConfig};
use crate::error::{IngestError, MalformedReason, RecordError, SkipReason};
use crate::record::{parse_verified, RecordSource, SourceRecord, TweetRecord};
use crate::row_key::{KeyTime, RowKeySynthesizer};
use crate::schema::*;

/// Records between progress log lines.
const PROGRESS_EVERY: u64 = 10_000;

/// Counters of one ingestion run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Data records read, header excluded.
    pub read: u64,
    pub written: u64,
    pub skipped: BTreeMap<SkipReason, u64>,
    /// Written records keyed by name only.
    pub key_fallbacks: u64,
    /// Numeric fields replaced by zero.
    pub numeric_coercions: u64,
}

impl IngestSummary {
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> u64 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "read: {}", self.read)?;
        writeln!(f, "written: {}", self.written)?;
        writeln!(f, "skipped: {}", self.skipped_total())?;
        for (reason, count) in &self.skipped {
            writeln!(f, "skipped {reason}: {count}")?;
        }
        writeln!(f, "key fallbacks: {}", self.key_fallbacks)?;
        write!(f, "numeric coercions: {}", self.numeric_coercions)
    }
}

/// One record ready to be written.
struct RowPlan {
    row_key: String,
    cells: Vec<ColumnWrite>,
    fallback: bool,
    coercions: u64,
}

/// Validates, normalizes and writes tweet records one at a time.
///
/// Per-record failures are counted and never stop the run; only a failure of
/// the input itself (or of the schema check) is fatal.
pub struct IngestPipeline<'a> {
    store: &'a dyn TableStore,
    table: TableConfig,
    config: IngestConfig,
    keys: RowKeySynthesizer,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(store: &'a dyn TableStore, table: TableConfig, config: IngestConfig) -> Self {
        let keys = RowKeySynthesizer::new(config.date_formats.clone());
        Self {
            store,
            table,
            config,
            keys,
        }
    }

    pub fn ingest_path(&self, path: &Path) -> Result<IngestSummary, IngestError> {
        let file = File::open(path).map_err(|err| IngestError::Open {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        tracing::info!(path = %path.display(), table = %self.table.table_name, "ingesting");
        self.ingest_reader(file)
    }

    pub fn ingest_reader<R: Read>(&self, reader: R) -> Result<IngestSummary, IngestError> {
        self.ingest(RecordSource::new(reader))
    }

    /// Ensure the schema, discard the first record as the header, then
    /// ingest every following record.
    pub fn ingest<I>(&self, records: I) -> Result<IngestSummary, IngestError>
    where
        I: IntoIterator<Item = csv::Result<SourceRecord>>,
    {
        SchemaManager::new(self.store).ensure(&self.table.table_name, &self.table.groups())?;

        let mut summary = IngestSummary::default();
        let mut records = records.into_iter();
        match records.next() {
            Some(Err(source)) => return Err(IngestError::Source { summary, source }),
            Some(Ok(_header)) => {}
            None => return Ok(summary),
        }

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(source) => return Err(IngestError::Source { summary, source }),
            };
            summary.read += 1;
            match self.ingest_record(record) {
                Ok(plan) => {
                    summary.written += 1;
                    summary.numeric_coercions += plan.coercions;
                    if plan.fallback {
                        summary.key_fallbacks += 1;
                    }
                }
                Err(err) => {
                    match &err {
                        RecordError::WriteFailure { row_key, source } => {
                            tracing::warn!(row_key = %row_key, error = ?source, "row write failed");
                        }
                        other => {
                            tracing::debug!(record = summary.read, reason = %other, "record skipped");
                        }
                    }
                    summary.record_skip(err.skip_reason());
                }
            }
            if summary.read % PROGRESS_EVERY == 0 {
                tracing::info!(read = summary.read, written = summary.written, "ingestion progress");
            }
        }

        tracing::info!(
            read = summary.read,
            written = summary.written,
            skipped = summary.skipped_total(),
            key_fallbacks = summary.key_fallbacks,
            numeric_coercions = summary.numeric_coercions,
            "ingestion finished"
        );
        Ok(summary)
    }

    fn ingest_record(&self, record: SourceRecord) -> Result<RowPlan, RecordError> {
        let fields = match record {
            SourceRecord::Fields(fields) => fields,
            SourceRecord::Undecodable(detail) => {
                return Err(RecordError::malformed(MalformedReason::Encoding, detail));
            }
        };
        let record = TweetRecord::from_fields(fields)?;
        let plan = self.plan(&record)?;
        self.store
            .write_row(&self.table.table_name, plan.row_key.as_bytes(), &plan.cells)
            .map_err(|source| RecordError::WriteFailure {
                row_key: plan.row_key.clone(),
                source,
            })?;
        Ok(plan)
    }

    fn plan(&self, record: &TweetRecord) -> Result<RowPlan, RecordError> {
        if record.name().is_empty() {
            return Err(RecordError::missing_identity());
        }

        let mut coercions = 0;
        let followers = self.parse_count(record.followers(), &mut coercions)?;
        let friends = self.parse_count(record.friends(), &mut coercions)?;
        let favourites = self.parse_count(record.favourites(), &mut coercions)?;

        let key = self.keys.synthesize(record.name(), Some(record.date()))?;
        let fallback = key.time == KeyTime::NameOnly;
        if fallback {
            if self.config.date_fallback == DateFallback::Skip {
                return Err(RecordError::malformed(
                    MalformedReason::EventDate,
                    format!("unusable event date {:?}", record.date()),
                ));
            }
            tracing::debug!(row_key = %key.key, date = record.date(), "event date unusable, keying by name");
        }

        let verified = parse_verified(record.verified()).map(|v| v.to_string());

        let mut cells = Vec::with_capacity(13);
        self.push(&mut cells, GROUP_IDENTITY, ATTR_NAME, record.name());
        push_typed(&mut cells, GROUP_IDENTITY, ATTR_VERIFIED, verified.as_deref());
        push_typed(&mut cells, GROUP_IDENTITY, ATTR_CREATED, Some(record.created()));
        self.push(&mut cells, GROUP_IDENTITY, ATTR_DESCRIPTION, record.description());
        self.push(&mut cells, GROUP_CONTENT, ATTR_TEXT, record.text());
        self.push(&mut cells, GROUP_CONTENT, ATTR_HASHTAGS, record.hashtags());
        self.push(&mut cells, GROUP_CONTENT, ATTR_IS_RETWEET, record.is_retweet());
        self.push(&mut cells, GROUP_CONTEXT, ATTR_SOURCE, record.source());
        self.push(&mut cells, GROUP_CONTEXT, ATTR_LOCATION, record.location());
        push_typed(&mut cells, GROUP_CONTEXT, ATTR_FOLLOWERS, followers.as_deref());
        push_typed(&mut cells, GROUP_CONTEXT, ATTR_FRIENDS, friends.as_deref());
        push_typed(&mut cells, GROUP_CONTEXT, ATTR_FAVOURITES, favourites.as_deref());
        self.push(&mut cells, GROUP_CONTEXT, ATTR_DATE, record.date());

        Ok(RowPlan {
            row_key: key.key,
            cells,
            fallback,
            coercions,
        })
    }

    /// Sparse by default: empty text values are only written as the configured marker.
    fn push(&self, cells: &mut Vec<ColumnWrite>, group: &str, attribute: &str, value: &str) {
        if !value.is_empty() {
            cells.push(ColumnWrite::new(group, attribute, value));
        } else if let Some(marker) = &self.config.empty_marker {
            cells.push(ColumnWrite::new(group, attribute, marker.as_str()));
        }
    }

    /// Canonical decimal form of a count column; `None` when the field is empty.
    fn parse_count(&self, raw: &str, coercions: &mut u64) -> Result<Option<String>, RecordError> {
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<u64>() {
            Ok(value) => Ok(Some(value.to_string())),
            Err(err) => match self.config.numeric_policy {
                NumericPolicy::Zero => {
                    *coercions += 1;
                    Ok(Some("0".to_string()))
                }
                NumericPolicy::Reject => Err(RecordError::malformed(
                    MalformedReason::Numeric,
                    format!("{raw:?}: {err}"),
                )),
            },
        }
    }
}

/// Flag, date and count columns stay sparse even with an empty marker, so
/// an absent value never reads back as `false`, a bad date or a bad number.
fn push_typed(cells: &mut Vec<ColumnWrite>, group: &str, attribute: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        cells.push(ColumnWrite::new(group, attribute, value));
    }
}
