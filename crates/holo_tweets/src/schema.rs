//! Table layout of the tweet store and idempotent schema registration.

use holo_table::{GroupDescriptor, StoreError, TableDescriptor, TableStore};

use crate::error::SchemaError;

pub const GROUP_IDENTITY: &str = "identity";
pub const GROUP_CONTENT: &str = "content";
pub const GROUP_CONTEXT: &str = "context";

pub const ATTR_NAME: &str = "name";
pub const ATTR_VERIFIED: &str = "verified";
pub const ATTR_CREATED: &str = "created";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_TEXT: &str = "text";
pub const ATTR_HASHTAGS: &str = "hashtags";
pub const ATTR_IS_RETWEET: &str = "is_retweet";
pub const ATTR_SOURCE: &str = "source";
pub const ATTR_LOCATION: &str = "location";
pub const ATTR_FOLLOWERS: &str = "followers";
pub const ATTR_FRIENDS: &str = "friends";
pub const ATTR_FAVOURITES: &str = "favourites";
pub const ATTR_DATE: &str = "date";

/// Result of [`SchemaManager::ensure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnsureOutcome {
    /// `true` only when this call created the table.
    pub created: bool,
    pub descriptor: TableDescriptor,
}

/// Ensures a table and its attribute groups exist without touching data.
pub struct SchemaManager<'a> {
    store: &'a dyn TableStore,
}

impl<'a> SchemaManager<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Create `table` with `groups` if absent, otherwise check that every
    /// requested group is present. Safe to call from independent runs.
    pub fn ensure(&self, table: &str, groups: &[GroupDescriptor]) -> Result<EnsureOutcome, SchemaError> {
        if let Some(existing) = self.store.describe_table(table)? {
            verify_groups(&existing, groups)?;
            return Ok(EnsureOutcome {
                created: false,
                descriptor: existing,
            });
        }

        let descriptor = TableDescriptor::new(table, groups.to_vec());
        match self.store.create_table(&descriptor) {
            Ok(()) => {
                tracing::info!(table, groups = groups.len(), "created table");
                Ok(EnsureOutcome {
                    created: true,
                    descriptor,
                })
            }
            // Another run created it first; its layout wins.
            Err(StoreError::TableExists(_)) => {
                let existing = self
                    .store
                    .describe_table(table)?
                    .ok_or_else(|| SchemaError::Vanished(table.to_string()))?;
                verify_groups(&existing, groups)?;
                tracing::debug!(table, "table created concurrently");
                Ok(EnsureOutcome {
                    created: false,
                    descriptor: existing,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn verify_groups(existing: &TableDescriptor, wanted: &[GroupDescriptor]) -> Result<(), SchemaError> {
    let mut missing = Vec::new();
    for group in wanted {
        match existing.group(&group.name) {
            None => missing.push(group.name.clone()),
            Some(found) if found.max_versions != group.max_versions => {
                // Existing retention policy is never altered.
                tracing::warn!(
                    table = %existing.name,
                    group = %group.name,
                    existing = found.max_versions,
                    requested = group.max_versions,
                    "keeping existing version cap"
                );
            }
            Some(_) => {}
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingGroups {
            table: existing.name.clone(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::TableConfig;
    use holo_table::{Cell, MemTable, RowScanner, Timestamp};

    /// Reports the table as absent for the first `hidden_lookups` describes,
    /// as if another run created it between our lookup and our create.
    struct LateDescribe {
        inner: MemTable,
        hidden_lookups: usize,
        lookups: AtomicUsize,
    }

    impl LateDescribe {
        fn new(inner: MemTable, hidden_lookups: usize) -> Self {
            Self {
                inner,
                hidden_lookups,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    impl TableStore for LateDescribe {
        fn create_table(&self, descriptor: &TableDescriptor) -> Result<(), StoreError> {
            self.inner.create_table(descriptor)
        }

        fn describe_table(&self, name: &str) -> Result<Option<TableDescriptor>, StoreError> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) < self.hidden_lookups {
                return Ok(None);
            }
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

    fn created_elsewhere() -> MemTable {
        let inner = MemTable::new();
        SchemaManager::new(&inner)
            .ensure("CovidData", &TableConfig::default().groups())
            .unwrap();
        inner
    }

    #[test]
    fn losing_creation_race_adopts_existing_table() {
        let store = LateDescribe::new(created_elsewhere(), 1);
        let outcome = SchemaManager::new(&store)
            .ensure("CovidData", &TableConfig::default().groups())
            .unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.descriptor.groups.len(), 3);
    }

    #[test]
    fn table_missing_after_exists_error_is_vanished() {
        let store = LateDescribe::new(created_elsewhere(), usize::MAX);
        let err = SchemaManager::new(&store)
            .ensure("CovidData", &TableConfig::default().groups())
            .unwrap_err();
        assert!(matches!(err, SchemaError::Vanished(ref table) if table == "CovidData"));
    }

    #[test]
    fn ensure_is_idempotent() {
        let store = MemTable::new();
        let manager = SchemaManager::new(&store);
        let groups = TableConfig::default().groups();

        let first = manager.ensure("CovidData", &groups).unwrap();
        assert!(first.created);
        let second = manager.ensure("CovidData", &groups).unwrap();
        assert!(!second.created);
        assert_eq!(first.descriptor, second.descriptor);
        assert_eq!(
            second.descriptor.group(GROUP_IDENTITY).map(|g| g.max_versions),
            Some(3)
        );
    }

    #[test]
    fn missing_group_is_reported_without_altering_table() {
        let store = MemTable::new();
        store
            .create_table(&TableDescriptor::new(
                "CovidData",
                vec![GroupDescriptor::new(GROUP_IDENTITY)],
            ))
            .unwrap();

        let err = SchemaManager::new(&store)
            .ensure("CovidData", &TableConfig::default().groups())
            .unwrap_err();
        match err {
            SchemaError::MissingGroups { missing, .. } => {
                assert_eq!(missing, vec![GROUP_CONTENT.to_string(), GROUP_CONTEXT.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        let kept = store.describe_table("CovidData").unwrap().unwrap();
        assert_eq!(kept.groups.len(), 1);
    }

    #[test]
    fn differing_cap_keeps_existing_policy() {
        let store = MemTable::new();
        let manager = SchemaManager::new(&store);
        manager
            .ensure("CovidData", &TableConfig::default().groups())
            .unwrap();

        let wider = TableConfig {
            identity_versions: 5,
            ..TableConfig::default()
        };
        let outcome = manager.ensure("CovidData", &wider.groups()).unwrap();
        assert_eq!(
            outcome.descriptor.group(GROUP_IDENTITY).map(|g| g.max_versions),
            Some(3)
        );
    }
}
