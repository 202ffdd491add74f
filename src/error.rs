use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildPulseError {
    #[error("Invalid build record: {0}")]
    InvalidRecord(#[from] RecordParseError),

    #[error("Invalid job name {0:?}: it must map to a directory inside the storage root")]
    InvalidJobName(String),

    #[error("No storage directory found")]
    NoStorageDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a history log line cannot be turned into a build record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordParseError {
    #[error("expected 4 comma-separated fields, found {found}")]
    FieldCount { found: usize },

    #[error("field `{field}` is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("start time {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("unknown outcome code: {0:?}")]
    UnknownOutcome(String),
}

pub type Result<T> = std::result::Result<T, BuildPulseError>;
