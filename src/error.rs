use std::path::PathBuf;

/// Rejected path construction. See [`crate::path::RelPath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is absolute: {0}")]
    Absolute(String),

    #[error("path escapes project root: {0}")]
    EscapesRoot(String),

    #[error("path is empty")]
    Empty,

    #[error("{path} is not under project root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Project configuration errors. Any of these aborts an indexing run before
/// a single file is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("alias prefix is empty")]
    EmptyPrefix,

    #[error("alias {prefix}: conflicting base directories {first} and {second}")]
    ConflictingAlias {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("alias {prefix}: invalid base directory {base_dir}: {source}")]
    InvalidBaseDir {
        prefix: String,
        base_dir: String,
        source: PathError,
    },

    #[error("alias {prefix}: base directory {base_dir} does not exist")]
    MissingBaseDir { prefix: String, base_dir: String },

    #[error("unsupported tsconfig path pattern {pattern:?}")]
    UnsupportedPattern { pattern: String },

    #[error("{field} must not be empty")]
    EmptyList { field: &'static str },

    #[error("invalid extension {extension:?}")]
    InvalidExtension { extension: String },

    #[error("invalid index file name {name:?}")]
    InvalidIndexFile { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("indexing cancelled")]
    Cancelled,
}
