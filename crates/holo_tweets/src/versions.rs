//! Versioned read path: recent values of one cell, newest first.

use holo_table::{Cell, StoreError, TableStore, Timestamp};

/// One retrieved version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub timestamp: Timestamp,
    pub value: String,
}

impl From<Cell> for Version {
    fn from(cell: Cell) -> Self {
        Self {
            timestamp: cell.timestamp,
            value: String::from_utf8_lossy(&cell.value).into_owned(),
        }
    }
}

/// Read and append versions of single cells of one table.
pub struct VersionReader<'a> {
    store: &'a dyn TableStore,
    table: &'a str,
}

impl<'a> VersionReader<'a> {
    pub fn new(store: &'a dyn TableStore, table: &'a str) -> Self {
        Self { store, table }
    }

    /// Up to `max_count` most recent versions. A row or attribute that was
    /// never written yields an empty vector; an unknown group is an error.
    pub fn get_versions(
        &self,
        row_key: &str,
        group: &str,
        attribute: &str,
        max_count: usize,
    ) -> Result<Vec<Version>, StoreError> {
        let cells = self
            .store
            .get(self.table, row_key.as_bytes(), group, attribute, max_count)?;
        Ok(cells.into_iter().map(Version::from).collect())
    }

    /// Write each value in order as a new version of one cell.
    pub fn append_versions<S: AsRef<str>>(
        &self,
        row_key: &str,
        group: &str,
        attribute: &str,
        values: &[S],
    ) -> Result<Vec<Timestamp>, StoreError> {
        let mut stamps = Vec::with_capacity(values.len());
        for value in values {
            let ts = self.store.put(
                self.table,
                row_key.as_bytes(),
                group,
                attribute,
                value.as_ref().as_bytes(),
            )?;
            tracing::debug!(row_key, group, attribute, timestamp = %ts, "appended version");
            stamps.push(ts);
        }
        Ok(stamps)
    }
}
