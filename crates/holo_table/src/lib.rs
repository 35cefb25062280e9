//! Sorted, versioned, attribute-group oriented table storage.
//!
//! A table is a set of rows addressed by byte-comparable row keys. Each row is
//! split into attribute groups (column families); every attribute cell keeps
//! up to its group's `max_versions` timestamped values, newest first.
//!
//! Two engines implement [`TableStore`]:
//! - [`FjallTable`]: persistent, one fjall partition per attribute group.
//! - [`MemTable`]: in-process, same semantics, for tests and dry runs.

pub mod clock;
pub mod codec;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod fjall_table;
pub mod mem_table;

pub use clock::{Timestamp, VersionClock};
pub use descriptor::{GroupDescriptor, TableDescriptor, DEFAULT_MAX_VERSIONS};
pub use engine::{Cell, ColumnWrite, Row, RowScanner, TableStore};
pub use error::StoreError;
pub use fjall_table::FjallTable;
pub use mem_table::MemTable;
