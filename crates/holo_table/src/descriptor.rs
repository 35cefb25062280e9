//! Table and attribute-group descriptors persisted in the table catalog.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Longest accepted table or group name.
const MAX_NAME_LEN: usize = 64;
/// Version cap used when a group does not ask for history.
pub const DEFAULT_MAX_VERSIONS: u32 = 1;

/// One attribute group (column family) and its version-retention cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    /// Group name, also used to derive the storage partition name.
    pub name: String,
    /// Maximum number of versions kept per cell; older versions are dropped on write.
    #[serde(default = "default_max_versions")]
    pub max_versions: u32,
}

fn default_max_versions() -> u32 {
    DEFAULT_MAX_VERSIONS
}

impl GroupDescriptor {
    /// Group that keeps only the latest value of each cell.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_versions: DEFAULT_MAX_VERSIONS,
        }
    }

    /// Group that keeps up to `max_versions` values per cell.
    pub fn versioned(name: impl Into<String>, max_versions: u32) -> Self {
        Self {
            name: name.into(),
            max_versions,
        }
    }
}

/// Persisted description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub groups: Vec<GroupDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, groups: Vec<GroupDescriptor>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    pub fn group(&self, name: &str) -> Option<&GroupDescriptor> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Resolve a group or report it as unknown for this table.
    pub fn require_group(&self, name: &str) -> Result<&GroupDescriptor> {
        self.group(name).ok_or_else(|| StoreError::UnknownGroup {
            table: self.name.clone(),
            group: name.to_string(),
        })
    }

    /// Validates names and caps before the descriptor is persisted.
    pub fn validate(&self) -> Result<()> {
        validate_name("table", &self.name)?;
        // A table without groups could never hold a cell.
        if self.groups.is_empty() {
            return Err(StoreError::InvalidDescriptor {
                table: self.name.clone(),
                reason: "at least one attribute group is required".to_string(),
            });
        }
        for (idx, group) in self.groups.iter().enumerate() {
            validate_name("group", &group.name)?;
            // A zero cap would discard every write.
            if group.max_versions == 0 {
                return Err(StoreError::InvalidDescriptor {
                    table: self.name.clone(),
                    reason: format!("group {} has max_versions=0", group.name),
                });
            }
            if self.groups[..idx].iter().any(|g| g.name == group.name) {
                return Err(StoreError::InvalidDescriptor {
                    table: self.name.clone(),
                    reason: format!("group {} declared twice", group.name),
                });
            }
        }
        Ok(())
    }
}

/// Table and group names end up in storage partition names (`{table}-{group}`),
/// so they are restricted to ASCII alphanumerics and `_`.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    let invalid = |reason| StoreError::InvalidName {
        kind,
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("longer than 64 bytes"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(invalid("only ASCII alphanumerics and '_' are allowed"));
    }
    Ok(())
}
