//! Error types for root manifest parsing and indexing

use crate::keys::FileDataId;
use thiserror::Error;

/// Errors that can occur when parsing, indexing or configuring root manifests
#[derive(Error, Debug)]
pub enum RootError {
    /// Stream ended before a complete header, block header or block body
    #[error("Truncated root manifest at offset {offset}")]
    Truncated {
        /// Offset of the structure that could not be read completely
        offset: u64,
    },

    /// Block declares no locale at all
    #[error("Block at offset {offset} has empty locale flags")]
    InvalidLocaleFlags {
        /// Offset of the offending block header
        offset: u64,
    },

    /// Block content flags do not intersect any recognized bit
    #[error("Block at offset {offset} has unrecognized content flags {flags:08x}")]
    UnknownContentFlags {
        /// Offset of the offending block header
        offset: u64,
        /// Raw content flags value
        flags: u32,
    },

    /// Header counts disagree with what was read (strict mode only)
    #[error(
        "Declared counts do not match manifest: total {declared_total} vs {read_total}, named {declared_named} vs {read_named}"
    )]
    DeclaredCountMismatch {
        /// Total record count announced by the header
        declared_total: u32,
        /// Named record count announced by the header
        declared_named: u32,
        /// Records actually read
        read_total: u64,
        /// Records with name hashes actually read
        read_named: u64,
    },

    /// Same FileDataID seen with two different hashes under `ConflictPolicy::Reject`
    #[error("FileDataID {file_data_id} has hash {existing:016x}, refusing {incoming:016x}")]
    HashConflict {
        /// Conflicting identifier
        file_data_id: FileDataId,
        /// Canonical hash already recorded
        existing: u64,
        /// Hash carried by the rejected record
        incoming: u64,
    },

    /// Hash already maps to a different FileDataID under `ConflictPolicy::Reject`
    #[error("Hash {hash:016x} already maps to FileDataID {existing}, refusing {incoming}")]
    HashCollision {
        /// Colliding hash
        hash: u64,
        /// Identifier the hash already resolves to
        existing: FileDataId,
        /// Identifier that tried to claim it
        incoming: FileDataId,
    },

    /// Invalid configuration document
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `BinRW` parsing/writing error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl RootError {
    /// Whether this error means the manifest itself is malformed
    pub const fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::InvalidLocaleFlags { .. }
                | Self::UnknownContentFlags { .. }
                | Self::DeclaredCountMismatch { .. }
                | Self::BinRw(_)
        )
    }

    /// Map a binrw failure at `offset`, turning unexpected EOF into `Truncated`
    pub(crate) fn from_binrw(err: binrw::Error, offset: u64) -> Self {
        if err.is_eof() {
            Self::Truncated { offset }
        } else {
            Self::BinRw(err)
        }
    }

    /// Map an I/O failure at `offset`, turning unexpected EOF into `Truncated`
    pub(crate) fn from_io(err: std::io::Error, offset: u64) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Truncated { offset }
        } else {
            Self::Io(err)
        }
    }
}

/// Type alias for root manifest operation results
pub type Result<T> = std::result::Result<T, RootError>;
