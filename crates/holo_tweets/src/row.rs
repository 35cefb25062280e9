//! Typed view of a scanned tweet row.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use holo_table::Row;

use crate::error::RowFault;
use crate::record::parse_verified;
use crate::schema::*;

/// Latest values of one stored tweet. Empty values read as absent.
#[derive(Clone, Debug)]
pub struct TweetRow {
    row: Row,
}

impl TweetRow {
    pub fn new(row: Row) -> Self {
        Self { row }
    }

    pub fn key(&self) -> Cow<'_, str> {
        self.row.key_lossy()
    }

    fn text_of(&self, group: &str, attribute: &str) -> Option<&str> {
        self.row
            .value_str(group, attribute)
            .filter(|value| !value.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.text_of(GROUP_IDENTITY, ATTR_NAME)
    }

    pub fn location(&self) -> Option<&str> {
        self.text_of(GROUP_CONTEXT, ATTR_LOCATION)
    }

    pub fn source(&self) -> Option<&str> {
        self.text_of(GROUP_CONTEXT, ATTR_SOURCE)
    }

    pub fn text(&self) -> Option<&str> {
        self.text_of(GROUP_CONTENT, ATTR_TEXT)
    }

    pub fn hashtags(&self) -> Option<&str> {
        self.text_of(GROUP_CONTENT, ATTR_HASHTAGS)
    }

    pub fn verified(&self) -> Option<bool> {
        self.text_of(GROUP_IDENTITY, ATTR_VERIFIED).and_then(parse_verified)
    }

    pub fn followers(&self) -> Result<Option<u64>, RowFault> {
        self.number(GROUP_CONTEXT, ATTR_FOLLOWERS)
    }

    /// Account creation time in `format`.
    pub fn created(&self, format: &str) -> Result<Option<NaiveDateTime>, RowFault> {
        let Some(raw) = self.text_of(GROUP_IDENTITY, ATTR_CREATED) else {
            return Ok(None);
        };
        NaiveDateTime::parse_from_str(raw, format)
            .map(Some)
            .map_err(|_| RowFault::InvalidDate {
                attribute: ATTR_CREATED,
                value: raw.to_string(),
            })
    }

    fn number(&self, group: &str, attribute: &'static str) -> Result<Option<u64>, RowFault> {
        let Some(raw) = self.text_of(group, attribute) else {
            return Ok(None);
        };
        raw.parse().map(Some).map_err(|_| RowFault::InvalidNumber {
            attribute,
            value: raw.to_string(),
        })
    }
}
