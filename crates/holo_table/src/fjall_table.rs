//! Persistent table engine on a fjall keyspace.
//!
//! Layout:
//! - `catalog` partition: table name -> JSON `TableDescriptor`.
//! - one partition per attribute group, named `{table}-{group}`, holding one
//!   entry per cell version (see [`crate::codec`]).
//!
//! Scans merge the group partitions by row key, so a scan over two groups
//! still yields each row exactly once and in row-key byte order.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use tracing::{debug, info};

use crate::clock::{Timestamp, VersionClock};
use crate::codec::{decode_cell_key, encode_cell_key, encode_cell_prefix};
use crate::descriptor::TableDescriptor;
use crate::engine::{Cell, ColumnWrite, Row, RowScanner, TableStore};
use crate::error::{Result, StoreError};

const CATALOG_PARTITION: &str = "catalog";

fn group_partition_name(table: &str, group: &str) -> String {
    format!("{table}-{group}")
}

pub struct FjallTable {
    keyspace: Arc<Keyspace>,
    catalog: PartitionHandle,
    partitions: RwLock<HashMap<String, PartitionHandle>>,
    descriptors: RwLock<HashMap<String, TableDescriptor>>,
    clock: VersionClock,
    lock: RwLock<()>,
}

impl FjallTable {
    /// Open (or create) a keyspace rooted at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let keyspace = fjall::Config::new(path).open()?;
        info!(path = %path.display(), "opened fjall keyspace");
        Self::from_keyspace(Arc::new(keyspace))
    }

    pub fn from_keyspace(keyspace: Arc<Keyspace>) -> Result<Self> {
        let catalog = keyspace.open_partition(CATALOG_PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            catalog,
            partitions: RwLock::new(HashMap::new()),
            descriptors: RwLock::new(HashMap::new()),
            clock: VersionClock::new(),
            lock: RwLock::new(()),
        })
    }

    /// Flush the journal to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn partition(&self, table: &str, group: &str) -> Result<PartitionHandle> {
        let name = group_partition_name(table, group);
        if let Some(handle) = self
            .partitions
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(&name)
        {
            return Ok(handle.clone());
        }
        let handle = self
            .keyspace
            .open_partition(&name, PartitionCreateOptions::default())?;
        self.partitions
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(name, handle.clone());
        Ok(handle)
    }

    fn load_descriptor(&self, name: &str) -> Result<Option<TableDescriptor>> {
        if let Some(desc) = self
            .descriptors
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(name)
        {
            return Ok(Some(desc.clone()));
        }
        let Some(bytes) = self.catalog.get(name)? else {
            return Ok(None);
        };
        let desc: TableDescriptor = serde_json::from_slice(&bytes)?;
        // Descriptors never change after creation, so caching positives is safe.
        self.descriptors
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(name.to_string(), desc.clone());
        Ok(Some(desc))
    }

    fn require_table(&self, name: &str) -> Result<TableDescriptor> {
        self.load_descriptor(name)?
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    /// Existing version keys of one cell, newest first.
    fn cell_version_keys(&self, partition: &PartitionHandle, prefix: Vec<u8>) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        for item in partition.prefix(prefix) {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }
}

impl TableStore for FjallTable {
    fn create_table(&self, descriptor: &TableDescriptor) -> Result<()> {
        descriptor.validate()?;
        let _guard = self.lock.write().map_err(|_| StoreError::Poisoned)?;
        if self.catalog.get(&descriptor.name)?.is_some() {
            return Err(StoreError::TableExists(descriptor.name.clone()));
        }
        for group in &descriptor.groups {
            self.partition(&descriptor.name, &group.name)?;
        }
        let encoded = serde_json::to_vec(descriptor)?;
        self.catalog.insert(descriptor.name.as_str(), encoded)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        info!(
            table = %descriptor.name,
            groups = descriptor.groups.len(),
            "created table"
        );
        Ok(())
    }

    fn describe_table(&self, name: &str) -> Result<Option<TableDescriptor>> {
        self.load_descriptor(name)
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
        let descriptor = self.require_table(table)?;
        let _guard = self.lock.write().map_err(|_| StoreError::Poisoned)?;

        // Resolve every cell before writing anything so one bad group rejects the row.
        let mut plans = Vec::with_capacity(cells.len());
        let mut floor = Timestamp::from_micros(0);
        for cell in cells {
            let cap = descriptor.require_group(&cell.group)?.max_versions.max(1) as usize;
            let partition = self.partition(table, &cell.group)?;
            let prefix = encode_cell_prefix(row_key, cell.attribute.as_bytes());
            let existing = self.cell_version_keys(&partition, prefix)?;
            if let Some(newest) = existing.first() {
                let decoded = decode_cell_key(newest).map_err(|reason| {
                    StoreError::corrupt(group_partition_name(table, &cell.group), reason)
                })?;
                floor = floor.max(decoded.timestamp);
            }
            plans.push((cell, cap, partition, existing));
        }

        let timestamp = self.clock.next_after(floor);
        let mut batch = self.keyspace.batch();
        for (cell, cap, partition, existing) in plans {
            let key = encode_cell_key(row_key, cell.attribute.as_bytes(), timestamp);
            batch.insert(&partition, key, cell.value.clone());
            // The new version takes one slot of the cap; drop the oldest beyond it.
            for stale in existing.into_iter().skip(cap - 1) {
                batch.remove(&partition, stale);
            }
        }
        batch.commit()?;
        Ok(timestamp)
    }

    fn scan(&self, table: &str, groups: &[&str]) -> Result<RowScanner<'_>> {
        let descriptor = self.require_table(table)?;
        let _guard = self.lock.read().map_err(|_| StoreError::Poisoned)?;
        let mut cursors = Vec::with_capacity(groups.len());
        for group in groups {
            descriptor.require_group(group)?;
            let partition = self.partition(table, group)?;
            cursors.push(GroupCursor {
                group: group.to_string(),
                partition: group_partition_name(table, group),
                iter: Box::new(partition.iter()),
                head: None,
            });
        }
        debug!(table, groups = ?groups, "opened scanner");
        Ok(RowScanner::new(
            table,
            Box::new(MergedRows {
                cursors,
                done: false,
            }),
        ))
    }

    fn get(
        &self,
        table: &str,
        row_key: &[u8],
        group: &str,
        attribute: &str,
        max_versions: usize,
    ) -> Result<Vec<Cell>> {
        let descriptor = self.require_table(table)?;
        descriptor.require_group(group)?;
        let partition = self.partition(table, group)?;
        let prefix = encode_cell_prefix(row_key, attribute.as_bytes());
        let mut out = Vec::new();
        for item in partition.prefix(prefix).take(max_versions) {
            let (key, value) = item?;
            let decoded = decode_cell_key(&key)
                .map_err(|reason| StoreError::corrupt(group_partition_name(table, group), reason))?;
            out.push(Cell {
                timestamp: decoded.timestamp,
                value: value.to_vec(),
            });
        }
        Ok(out)
    }
}

/// Next undecoded cell of one group partition.
struct CellEntry {
    row_key: Vec<u8>,
    attribute: String,
    value: Vec<u8>,
}

struct GroupCursor {
    group: String,
    partition: String,
    iter: Box<dyn Iterator<Item = fjall::Result<fjall::KvPair>>>,
    head: Option<CellEntry>,
}

impl GroupCursor {
    fn fill(&mut self) -> Result<()> {
        if self.head.is_some() {
            return Ok(());
        }
        let Some(item) = self.iter.next() else {
            return Ok(());
        };
        let (key, value) = item?;
        let decoded =
            decode_cell_key(&key).map_err(|reason| StoreError::corrupt(&self.partition, reason))?;
        let attribute = String::from_utf8(decoded.attribute)
            .map_err(|_| StoreError::corrupt(&self.partition, "attribute name is not utf-8"))?;
        self.head = Some(CellEntry {
            row_key: decoded.row_key,
            attribute,
            value: value.to_vec(),
        });
        Ok(())
    }
}

/// K-way merge of group cursors into rows.
struct MergedRows {
    cursors: Vec<GroupCursor>,
    done: bool,
}

impl MergedRows {
    fn next_row(&mut self) -> Result<Option<Row>> {
        for cursor in &mut self.cursors {
            cursor.fill()?;
        }
        let Some(key) = self
            .cursors
            .iter()
            .filter_map(|c| c.head.as_ref().map(|h| &h.row_key))
            .min()
            .cloned()
        else {
            return Ok(None);
        };

        let mut row = Row::new(key.clone());
        for cursor in &mut self.cursors {
            loop {
                cursor.fill()?;
                match &cursor.head {
                    Some(head) if head.row_key == key => {}
                    _ => break,
                }
                let Some(entry) = cursor.head.take() else {
                    break;
                };
                // Versions arrive newest first; keep only the latest per attribute.
                if row.value(&cursor.group, &entry.attribute).is_none() {
                    row.insert(&cursor.group, entry.attribute, entry.value);
                }
            }
        }
        Ok(Some(row))
    }
}

impl Iterator for MergedRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                // A failed cursor cannot be resumed reliably.
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
