use thiserror::Error;

/// Errors surfaced by table engines.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table {0} does not exist")]
    TableNotFound(String),

    #[error("table {0} already exists")]
    TableExists(String),

    #[error("table {table} has no attribute group {group}")]
    UnknownGroup { table: String, group: String },

    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("invalid table descriptor for {table}: {reason}")]
    InvalidDescriptor { table: String, reason: String },

    #[error("corrupt entry in {partition}: {reason}")]
    Corrupt { partition: String, reason: String },

    #[error("storage engine error: {0}")]
    Engine(#[from] fjall::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn corrupt(partition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            partition: partition.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
