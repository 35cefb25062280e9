//! Raw tweet records: CSV reassembly, field normalization and column layout.

use std::io::Read;

use crate::error::{MalformedReason, RecordError};

/// Columns per record, in input order.
pub const FIELD_COUNT: usize = 13;

const COL_NAME: usize = 0;
const COL_LOCATION: usize = 1;
const COL_DESCRIPTION: usize = 2;
const COL_CREATED: usize = 3;
const COL_FOLLOWERS: usize = 4;
const COL_FRIENDS: usize = 5;
const COL_FAVOURITES: usize = 6;
const COL_VERIFIED: usize = 7;
const COL_DATE: usize = 8;
const COL_TEXT: usize = 9;
const COL_HASHTAGS: usize = 10;
const COL_SOURCE: usize = 11;
const COL_IS_RETWEET: usize = 12;

/// One record as produced by the input reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceRecord {
    /// Normalized fields; the count is not yet checked.
    Fields(Vec<String>),
    /// The record could not be decoded as text.
    Undecodable(String),
}

impl SourceRecord {
    /// Normalize raw field text into a record.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SourceRecord::Fields(fields.into_iter().map(|f| normalize_field(f.as_ref())).collect())
    }
}

/// Lazy record stream over CSV text.
///
/// Quoted fields may span lines; the reader keeps them in one field. The
/// reader does no header handling, so the first yielded record is the header.
pub struct RecordSource<R: Read> {
    records: csv::ByteRecordsIntoIter<R>,
}

impl<R: Read> RecordSource<R> {
    pub fn new(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        Self {
            records: reader.into_byte_records(),
        }
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = csv::Result<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(err)),
        };
        let mut fields = Vec::with_capacity(record.len());
        for (index, raw) in record.iter().enumerate() {
            match std::str::from_utf8(raw) {
                Ok(text) => fields.push(normalize_field(text)),
                Err(err) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    return Some(Ok(SourceRecord::Undecodable(format!(
                        "line {line} field {index}: {err}"
                    ))));
                }
            }
        }
        Some(Ok(SourceRecord::Fields(fields)))
    }
}

/// Collapse each run of line breaks to one space, then trim.
pub fn normalize_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_break = false;
    for ch in raw.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out.trim().to_string()
}

/// Verification flag rule used everywhere: case-insensitive `true` is true,
/// any other non-empty value is false, empty is absent.
pub fn parse_verified(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.eq_ignore_ascii_case("true"))
    }
}

/// Fixed-width tweet record with named columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TweetRecord {
    fields: Vec<String>,
}

impl TweetRecord {
    pub fn from_fields(fields: Vec<String>) -> Result<Self, RecordError> {
        if fields.len() != FIELD_COUNT {
            return Err(RecordError::malformed(
                MalformedReason::FieldCount,
                format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
            ));
        }
        Ok(Self { fields })
    }

    pub fn name(&self) -> &str {
        &self.fields[COL_NAME]
    }

    pub fn location(&self) -> &str {
        &self.fields[COL_LOCATION]
    }

    pub fn description(&self) -> &str {
        &self.fields[COL_DESCRIPTION]
    }

    pub fn created(&self) -> &str {
        &self.fields[COL_CREATED]
    }

    pub fn followers(&self) -> &str {
        &self.fields[COL_FOLLOWERS]
    }

    pub fn friends(&self) -> &str {
        &self.fields[COL_FRIENDS]
    }

    pub fn favourites(&self) -> &str {
        &self.fields[COL_FAVOURITES]
    }

    pub fn verified(&self) -> &str {
        &self.fields[COL_VERIFIED]
    }

    pub fn date(&self) -> &str {
        &self.fields[COL_DATE]
    }

    pub fn text(&self) -> &str {
        &self.fields[COL_TEXT]
    }

    pub fn hashtags(&self) -> &str {
        &self.fields[COL_HASHTAGS]
    }

    pub fn source(&self) -> &str {
        &self.fields[COL_SOURCE]
    }

    pub fn is_retweet(&self) -> &str {
        &self.fields[COL_IS_RETWEET]
    }
}
