//! Error types for storefront_sync

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for sync and export operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Store unreachable, missing, or not a database
    #[error("Connection error ({path}): {source}")]
    Connection {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Table or column name outside the identifier grammar
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    /// Upsert called with no rows
    #[error("Refusing to upsert an empty batch into {table}")]
    EmptyBatch { table: String },
    /// Batch shape or value type defect, found before any write
    #[error("Invalid row #{index} for {table}: {reason}")]
    InvalidRow {
        table: String,
        index: usize,
        reason: String,
    },
    /// Creating or resetting the storefront tables failed
    #[error("Schema error: {0}")]
    Schema(#[source] rusqlite::Error),
    /// Table does not exist in the store
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    /// Statement failure inside the upsert transaction (batch rolled back)
    #[error("Upsert into {table} failed{}: {source}", row_suffix(.index))]
    Upsert {
        table: String,
        index: Option<usize>,
        #[source]
        source: rusqlite::Error,
    },
    /// Read failure while scanning a table
    #[error("Export of {table} failed: {source}")]
    Export {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    /// File I/O failed
    #[error("I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse or encode JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn row_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" at row #{}", i),
        None => String::new(),
    }
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Position of the offending row within the batch, when known
    pub fn row_index(&self) -> Option<usize> {
        match self {
            SyncError::InvalidRow { index, .. } => Some(*index),
            SyncError::Upsert { index, .. } => *index,
            _ => None,
        }
    }
}

/// Result alias for storefront_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
