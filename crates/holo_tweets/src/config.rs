//! Explicit configuration values handed to each component at construction.

use std::path::PathBuf;

use holo_table::GroupDescriptor;

use crate::schema::{GROUP_CONTENT, GROUP_CONTEXT, GROUP_IDENTITY};

/// Table used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "CovidData";
/// Versions kept per identity cell (description history).
pub const DEFAULT_IDENTITY_VERSIONS: u32 = 3;
/// Followers strictly above this make a verified user influential.
pub const DEFAULT_INFLUENCER_THRESHOLD: u64 = 10_000;
/// Timestamp layout of the `created` and `date` columns.
pub const DEFAULT_EVENT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_HASHTAG_FILTER: &str = "COVID19";
pub const DEFAULT_SOURCE_FILTER: &str = "Android";

/// Table name and attribute-group layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub identity_versions: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            identity_versions: DEFAULT_IDENTITY_VERSIONS,
        }
    }
}

impl TableConfig {
    /// Group layout: identity is explicitly versioned, the rest keep one version.
    pub fn groups(&self) -> Vec<GroupDescriptor> {
        vec![
            GroupDescriptor::versioned(GROUP_IDENTITY, self.identity_versions.max(1)),
            GroupDescriptor::new(GROUP_CONTENT),
            GroupDescriptor::new(GROUP_CONTEXT),
        ]
    }
}

/// What to do with a record whose event date is absent or unparsable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DateFallback {
    /// Key the record by name only; same-name records collide into versions.
    #[default]
    NameOnly,
    /// Reject the record as malformed.
    Skip,
}

/// What to do with a numeric column that does not parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NumericPolicy {
    /// Store zero in place of the unparsable value.
    #[default]
    Zero,
    /// Reject the record as malformed.
    Reject,
}

/// Policies of the ingestion pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    /// Accepted `strftime` layouts for the event date, tried in order.
    pub date_formats: Vec<String>,
    pub date_fallback: DateFallback,
    pub numeric_policy: NumericPolicy,
    /// `None` writes sparsely (empty fields are skipped); `Some(marker)`
    /// writes the marker for every empty field instead.
    pub empty_marker: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            date_formats: vec![DEFAULT_EVENT_DATE_FORMAT.to_string()],
            date_fallback: DateFallback::default(),
            numeric_policy: NumericPolicy::default(),
            empty_marker: None,
        }
    }
}

/// Parameters of the scan analytics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyticsConfig {
    pub influencer_threshold: u64,
    pub hashtag_filter: String,
    pub source_filter: String,
    /// Layout of the `created` column used for account age.
    pub created_format: String,
    pub output_dir: PathBuf,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            influencer_threshold: DEFAULT_INFLUENCER_THRESHOLD,
            hashtag_filter: DEFAULT_HASHTAG_FILTER.to_string(),
            source_filter: DEFAULT_SOURCE_FILTER.to_string(),
            created_format: DEFAULT_EVENT_DATE_FORMAT.to_string(),
            output_dir: PathBuf::from("reports"),
        }
    }
}

/// Full application configuration assembled by the CLI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TweetsConfig {
    pub table: TableConfig,
    pub ingest: IngestConfig,
    pub analytics: AnalyticsConfig,
}
