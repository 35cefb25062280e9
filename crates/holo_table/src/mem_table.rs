//! In-process table engine.
//!
//! Keeps the same semantics as the fjall engine (row-key byte order, newest
//! first versions, per-group caps) without touching disk. Used by tests and
//! by the `memory` engine of the CLI for dry runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::clock::{Timestamp, VersionClock};
use crate::descriptor::TableDescriptor;
use crate::engine::{Cell, ColumnWrite, Row, RowScanner, TableStore};
use crate::error::{Result, StoreError};

/// Versions of one cell, newest first.
type CellVersions = Vec<Cell>;
/// row key -> attribute -> versions
type GroupData = BTreeMap<Vec<u8>, BTreeMap<String, CellVersions>>;

struct MemTableData {
    descriptor: TableDescriptor,
    groups: BTreeMap<String, GroupData>,
}

impl MemTableData {
    fn newest(&self, row_key: &[u8], cell: &ColumnWrite) -> Option<Timestamp> {
        self.groups
            .get(&cell.group)
            .and_then(|g| g.get(row_key))
            .and_then(|attrs| attrs.get(&cell.attribute))
            .and_then(|versions| versions.first())
            .map(|c| c.timestamp)
    }

    fn append(&mut self, row_key: &[u8], cell: &ColumnWrite, timestamp: Timestamp) -> Result<()> {
        let cap = self.descriptor.require_group(&cell.group)?.max_versions as usize;
        let versions = self
            .groups
            .entry(cell.group.clone())
            .or_default()
            .entry(row_key.to_vec())
            .or_default()
            .entry(cell.attribute.clone())
            .or_default();
        versions.insert(
            0,
            Cell {
                timestamp,
                value: cell.value.clone(),
            },
        );
        versions.truncate(cap.max(1));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemTable {
    clock: VersionClock,
    inner: RwLock<BTreeMap<String, MemTableData>>,
}

impl MemTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemTable {
    fn create_table(&self, descriptor: &TableDescriptor) -> Result<()> {
        descriptor.validate()?;
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if guard.contains_key(&descriptor.name) {
            return Err(StoreError::TableExists(descriptor.name.clone()));
        }
        guard.insert(
            descriptor.name.clone(),
            MemTableData {
                descriptor: descriptor.clone(),
                groups: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn describe_table(&self, name: &str) -> Result<Option<TableDescriptor>> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(name).map(|t| t.descriptor.clone()))
    }

    fn put(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        value: &[u8],
    ) -> Result<Timestamp> {
        self.write_row(table, row_key, &[ColumnWrite::new(group, attribute, value)])
    }

    fn write_row(&self, table: &str, row_key: &[u8], cells: &[ColumnWrite]) -> Result<Timestamp> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let data = guard
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        // Validate every group before touching data so a bad cell leaves the row untouched.
        let mut floor = Timestamp::from_micros(0);
        for cell in cells {
            data.descriptor.require_group(&cell.group)?;
            if let Some(newest) = data.newest(row_key, cell) {
                floor = floor.max(newest);
            }
        }
        // One timestamp per row write, like a single multi-cell put.
        let timestamp = self.clock.next_after(floor);
        for cell in cells {
            data.append(row_key, cell, timestamp)?;
        }
        Ok(timestamp)
    }

    fn scan(&self, table: &str, groups: &[&str]) -> Result<RowScanner<'_>> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let data = guard
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        for group in groups {
            data.descriptor.require_group(group)?;
        }

        // Snapshot the latest values so the lock is not held while the caller iterates.
        let mut rows: BTreeMap<Vec<u8>, Row> = BTreeMap::new();
        for group in groups {
            let Some(group_data) = data.groups.get(*group) else {
                continue;
            };
            for (row_key, attrs) in group_data {
                for (attribute, versions) in attrs {
                    let Some(latest) = versions.first() else {
                        continue;
                    };
                    rows.entry(row_key.clone())
                        .or_insert_with(|| Row::new(row_key.clone()))
                        .insert(group, attribute.clone(), latest.value.clone());
                }
            }
        }
        Ok(RowScanner::new(table, Box::new(rows.into_values().map(Ok))))
    }

    fn get(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        max_versions: usize,
    ) -> Result<Vec<Cell>> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let data = guard
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        data.descriptor.require_group(group)?;
        let versions = data
            .groups
            .get(group)
            .and_then(|g| g.get(row_key))
            .and_then(|attrs| attrs.get(attribute));
        Ok(versions
            .map(|v| v.iter().take(max_versions).cloned().collect())
            .unwrap_or_default())
    }
}
