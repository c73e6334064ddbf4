//! Error types for stay loading
//!
//! - [`LineError`]: one record could not be decoded; the file continues
//! - [`LoadError`]: a whole input could not be loaded
//! - [`PackError`]: pack container problems

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Kind of fixed-width record, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// RSS / GRP unit stay line
    Rum,
    /// RSA anonymised stay line
    Rsa,
    /// FICHCOMP complementary line
    FichComp,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rum => "RUM",
            Self::Rsa => "RSA",
            Self::FichComp => "FICHCOMP",
        })
    }
}

/// Errors for a single record line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    /// Line is shorter than its declared layout
    #[error("truncated {0} line")]
    Truncated(RecordKind),

    /// FICHCOMP line carries an unknown record type
    #[error("unknown or invalid FICHCOMP type {0}")]
    UnknownFichCompType(i32),

    /// FICHCOMP line with a known type but bad content
    #[error("malformed {kind} (FICHCOMP) line")]
    MalformedFichComp {
        /// Record family (UCD, DIP)
        kind: &'static str,
    },
}

/// Errors while reading or writing pack files
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// Underlying IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the pack signature
    #[error("missing stay pack signature")]
    BadSignature,

    /// Pack written by an incompatible version
    #[error("unsupported pack version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u8,
        /// Version this build writes
        expected: u8,
    },

    /// Pack is truncated or its checksum does not match
    #[error("stay pack appears to be corrupt or truncated: {0}")]
    Corrupt(String),

    /// Payload could not be (de)serialized
    #[error("pack payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors for a whole input file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Extension does not map to a known format
    #[error("cannot load stays from '{path}' with unknown extension '{extension}'")]
    UnknownExtension {
        /// Offending file
        path: PathBuf,
        /// Extension found (may be empty)
        extension: String,
    },

    /// IO error while reading the file
    #[error("io error reading {path}: {source}")]
    Io {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Every record in the file failed to decode
    #[error("no valid record in {path} ({errors} line errors)")]
    NoValidRecord {
        /// Offending file
        path: PathBuf,
        /// Number of failed lines
        errors: usize,
    },

    /// Pack could not be loaded
    #[error("cannot load pack {path}: {source}")]
    Pack {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: PackError,
    },

    /// JSON document could not be parsed
    #[error("cannot load JSON stays from {path}: {source}")]
    Json {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
