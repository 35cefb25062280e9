use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::clock::Timestamp;
use crate::descriptor::TableDescriptor;
use crate::error::Result;

/// One stored version of a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub timestamp: Timestamp,
    pub value: Vec<u8>,
}

/// One attribute value addressed to a group, used by [`TableStore::write_row`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnWrite {
    pub group: String,
    pub attribute: String,
    pub value: Vec<u8>,
}

impl ColumnWrite {
    pub fn new(group: impl Into<String>, attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            group: group.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Latest values of one row, restricted to the groups a scan asked for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    key: Vec<u8>,
    groups: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

impl Row {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            groups: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    pub fn insert(&mut self, group: &str, attribute: impl Into<String>, value: Vec<u8>) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(attribute.into(), value);
    }

    pub fn value(&self, group: &str, attribute: &str) -> Option<&[u8]> {
        self.groups
            .get(group)
            .and_then(|attrs| attrs.get(attribute))
            .map(Vec::as_slice)
    }

    /// UTF-8 view of a value; non-UTF-8 bytes read as absent.
    pub fn value_str(&self, group: &str, attribute: &str) -> Option<&str> {
        self.value(group, attribute)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

/// Cursor over the rows of a table, in row-key byte order.
///
/// The underlying engine iterators are owned by the scanner and released when
/// it is dropped, whether the scan ran to completion or stopped on an error.
pub struct RowScanner<'a> {
    table: String,
    inner: Box<dyn Iterator<Item = Result<Row>> + 'a>,
    rows: u64,
}

impl<'a> RowScanner<'a> {
    pub fn new(table: impl Into<String>, inner: Box<dyn Iterator<Item = Result<Row>> + 'a>) -> Self {
        Self {
            table: table.into(),
            inner,
            rows: 0,
        }
    }
}

impl Iterator for RowScanner<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        if item.is_ok() {
            self.rows += 1;
        }
        Some(item)
    }
}

impl Drop for RowScanner<'_> {
    fn drop(&mut self) {
        tracing::debug!(table = %self.table, rows = self.rows, "scanner released");
    }
}

/// Sorted, versioned, attribute-group oriented table storage.
pub trait TableStore: Send + Sync {
    /// Create a table. Fails with `TableExists` if the name is taken.
    fn create_table(&self, descriptor: &TableDescriptor) -> Result<()>;

    fn describe_table(&self, name: &str) -> Result<Option<TableDescriptor>>;

    /// Append a new version of one cell and return its timestamp. Versions
    /// beyond the group's cap are dropped, oldest first.
    fn put(&self, table: &str, row_key: &[u8], group: &str, attribute: &str, value: &[u8])
        -> Result<Timestamp>;

    /// Write several cells of one row. Engines that can commit atomically
    /// override this; the default issues one `put` per cell and stops at the
    /// first failure.
    fn write_row(&self, table: &str, row_key: &[u8], cells: &[ColumnWrite]) -> Result<Timestamp> {
        let mut last = Timestamp::from_micros(0);
        for cell in cells {
            last = self.put(table, row_key, &cell.group, &cell.attribute, &cell.value)?;
        }
        Ok(last)
    }

    /// Ordered scan over every row that has at least one cell in `groups`.
    fn scan(&self, table: &str, groups: &[&str]) -> Result<RowScanner<'_>>;

    /// Up to `max_versions` versions of one cell, newest first. A missing row
    /// or attribute yields an empty vector.
    fn get(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        max_versions: usize,
    ) -> Result<Vec<Cell>>;
}
