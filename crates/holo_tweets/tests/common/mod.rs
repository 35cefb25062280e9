//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use holo_table::{
    Cell, FjallTable, MemTable, RowScanner, StoreError, TableDescriptor, TableStore, Timestamp,
};
use tempfile::TempDir;

pub const HEADER: [&str; 13] = [
    "user_name",
    "user_location",
    "user_description",
    "user_created",
    "user_followers",
    "user_friends",
    "user_favourites",
    "user_verified",
    "date",
    "text",
    "hashtags",
    "source",
    "is_retweet",
];

/// One input row with plausible defaults; override what a test cares about.
#[derive(Clone, Debug)]
pub struct Tweet {
    pub name: String,
    pub location: String,
    pub description: String,
    pub created: String,
    pub followers: String,
    pub friends: String,
    pub favourites: String,
    pub verified: String,
    pub date: String,
    pub text: String,
    pub hashtags: String,
    pub source: String,
    pub is_retweet: String,
}

impl Tweet {
    pub fn new(name: &str, date: &str) -> Self {
        Self {
            name: name.to_string(),
            location: String::new(),
            description: String::new(),
            created: "2015-06-01 08:00:00".to_string(),
            followers: "100".to_string(),
            friends: "50".to_string(),
            favourites: "10".to_string(),
            verified: "False".to_string(),
            date: date.to_string(),
            text: format!("tweet by {name}"),
            hashtags: String::new(),
            source: "Twitter Web App".to_string(),
            is_retweet: "False".to_string(),
        }
    }

    pub fn location(mut self, location: &str) -> Self {
        self.location = location.to_string();
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = if verified { "True" } else { "False" }.to_string();
        self
    }

    pub fn followers(mut self, followers: &str) -> Self {
        self.followers = followers.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn created(mut self, created: &str) -> Self {
        self.created = created.to_string();
        self
    }

    pub fn hashtags(mut self, hashtags: &str) -> Self {
        self.hashtags = hashtags.to_string();
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.location.clone(),
            self.description.clone(),
            self.created.clone(),
            self.followers.clone(),
            self.friends.clone(),
            self.favourites.clone(),
            self.verified.clone(),
            self.date.clone(),
            self.text.clone(),
            self.hashtags.clone(),
            self.source.clone(),
            self.is_retweet.clone(),
        ]
    }
}

/// Render a header plus `rows` as quoted CSV; rows may have any width.
pub fn csv_text(rows: &[Vec<String>]) -> String {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(HEADER).expect("write header");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    let bytes = writer.into_inner().expect("flush csv");
    String::from_utf8(bytes).expect("utf8 csv")
}

pub fn tweets_csv(tweets: &[Tweet]) -> String {
    csv_text(&tweets.iter().map(Tweet::fields).collect::<Vec<_>>())
}

pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write csv");
    path
}

/// Run `check` against a fresh in-memory store and a fresh fjall store.
pub fn with_engines(check: impl Fn(&dyn TableStore)) {
    let mem = MemTable::new();
    check(&mem);

    let dir = TempDir::new().expect("temp dir");
    let fjall = FjallTable::open(dir.path().join("keyspace")).expect("open fjall");
    check(&fjall);
}

/// Store whose scans fail after `rows_before_fault` rows.
pub struct FaultyScanStore {
    pub inner: MemTable,
    pub rows_before_fault: usize,
}

impl TableStore for FaultyScanStore {
    fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError> {
        self.inner.create_table(descriptor)
    }

    fn describe_table(&self, name: &str) -> Result<Option<TableDescriptor>, StoreError> {
        self.inner.describe_table(name)
    }

    fn put(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        value: &[u8],
    ) -> Result<Timestamp, StoreError> {
        self.inner.put(table, row_key, group, attribute, value)
    }

    fn scan(&self, table: &str, groups: &[&str]) -> Result<RowScanner<'_>, StoreError> {
        let rows = self.inner.scan(table, groups)?.take(self.rows_before_fault);
        let fault = std::iter::once(Err(StoreError::Corrupt {
            partition: format!("{table}-scan"),
            reason: "injected read fault".to_string(),
        }));
        Ok(RowScanner::new(table, Box::new(rows.chain(fault))))
    }

    fn get(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        max_versions: usize,
    ) -> Result<Vec<Cell>, StoreError> {
        self.inner.get(table, row_key, group, attribute, max_versions)
    }
}

/// Store that rejects every row write whose key starts with `reject_prefix`.
pub struct RejectingStore {
    pub inner: MemTable,
    pub reject_prefix: &'static str,
}

impl TableStore for RejectingStore {
    fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError> {
        self.inner.create_table(descriptor)
    }

    fn describe_table(&self, name: &str) -> Result<Option<TableDescriptor>, StoreError> {
        self.inner.describe_table(name)
    }

    fn put(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        value: &[u8],
    ) -> Result<Timestamp, StoreError> {
        if row_key.starts_with(self.reject_prefix.as_bytes()) {
            return Err(StoreError::Poisoned);
        }
        self.inner.put(table, row_key, group, attribute, value)
    }

    fn scan(&self, table: &str, groups: &[&str]) -> Result<RowScanner<'_>, StoreError> {
        self.inner.scan(table, groups)
    }

    fn get(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        max_versions: usize,
    ) -> Result<Vec<Cell>, StoreError> {
        self.inner.get(table, row_key, group, attribute, max_versions)
    }
}
