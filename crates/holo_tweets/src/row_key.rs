//! Deterministic row keys: normalized identity name plus a sortable event time.

use chrono::NaiveDateTime;

use crate::error::RecordError;

/// Fixed-width, lexicographically sortable timestamp layout.
const KEY_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// How the event time contributed to a synthesized key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyTime {
    /// The event time parsed and is part of the key.
    Event,
    /// No usable event time; the key is the name alone.
    NameOnly,
}

/// A synthesized row key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowKey {
    pub key: String,
    pub time: KeyTime,
}

impl RowKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }
}

/// Derives row keys from the identity name and event date of a record.
///
/// Records of the same identity sort together, in event-time order. When the
/// event time is missing or unparsable the key falls back to the name alone,
/// so such records of one identity land on the same row as successive versions.
#[derive(Clone, Debug)]
pub struct RowKeySynthesizer {
    date_formats: Vec<String>,
}

impl RowKeySynthesizer {
    pub fn new(date_formats: Vec<String>) -> Self {
        Self { date_formats }
    }

    pub fn synthesize(&self, name: &str, event_time: Option<&str>) -> Result<RowKey, RecordError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(RecordError::missing_identity());
        }
        match event_time.and_then(|raw| self.parse_time(raw)) {
            Some(time) => Ok(RowKey {
                key: format!("{name}_{}", time.format(KEY_TIME_FORMAT)),
                time: KeyTime::Event,
            }),
            None => Ok(RowKey {
                key: name,
                time: KeyTime::NameOnly,
            }),
        }
    }

    /// First configured layout that accepts the trimmed input.
    pub fn parse_time(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.date_formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    }
}

/// Trim and replace each whitespace run with a single `_`.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}
