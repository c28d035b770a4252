//! Index error type.

use std::path::PathBuf;

use thiserror::Error;

use super::version::SchemaVersion;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Index schema {0} is not supported")]
    SchemaNotSupported(SchemaVersion),

    #[error("Index schema {found} is newer than {latest} and can only be opened read-only")]
    NewerSchemaNotWritable {
        found: SchemaVersion,
        latest: SchemaVersion,
    },

    #[error("Index has no schema version record")]
    MissingVersionRecord,

    #[error("Invalid schema version record: {0}")]
    InvalidVersionRecord(String),

    #[error("Index already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Index not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Manifest already indexed: {id} {version}{}", channel_suffix(.channel))]
    ManifestAlreadyExists {
        id: String,
        version: String,
        channel: String,
    },

    #[error("Manifest not found: {id} {version}{}", channel_suffix(.channel))]
    ManifestNotFound {
        id: String,
        version: String,
        channel: String,
    },

    #[error("Index was opened read-only")]
    ReadOnly,

    #[error("Index has been prepared for packaging and can no longer be modified")]
    Packaged,

    #[error("Cannot migrate index from {from} to {to}")]
    MigrationNotSupported {
        from: SchemaVersion,
        to: SchemaVersion,
    },

    #[error("{operation} is not supported by index schema {version}")]
    NotSupportedBySchema {
        operation: &'static str,
        version: SchemaVersion,
    },
}

fn channel_suffix(channel: &str) -> String {
    if channel.is_empty() {
        String::new()
    } else {
        format!(" [{channel}]")
    }
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
