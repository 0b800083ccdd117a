use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Invalid container format: {0}")]
    InvalidFormat(String),

    #[error("Corrupt compressed data: {0}")]
    CorruptData(String),

    #[error("Truncated entry '{path}': expected {expected} bytes, read {actual}")]
    TruncatedEntry {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("No stored data for entry '{0}': encode or load it first")]
    MissingEntryData(String),

    #[error("Cannot encode '{path}': {reason}")]
    Encode { path: String, reason: String },

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Container has no backing file: save it before loading entries")]
    NoBackingFile,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index serialization error: {0}")]
    IndexSerialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PackError>;
