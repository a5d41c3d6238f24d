//! Manifest header detection
//!
//! Newer manifests open with a `TSFM` tag followed by two advisory counts.
//! Older manifests have no header at all and start directly with the first
//! block; the tag bytes are then given back to the block reader.

use crate::error::{Result, RootError};
use binrw::{BinRead, BinWrite};
use std::io::{Read, Seek, SeekFrom, Write};

/// Block body layout, decided by the presence of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestLayout {
    /// No header; content key and name hash interleaved per record
    Legacy,
    /// `TSFM` header; content keys then name hashes as separate arrays
    Extended,
}

impl ManifestLayout {
    /// Whether blocks of this layout may omit name hashes
    pub const fn supports_nameless_blocks(self) -> bool {
        matches!(self, Self::Extended)
    }
}

/// Record counts announced by an extended header
#[derive(BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[brw(little)]
pub struct DeclaredCounts {
    /// Records across all blocks
    pub total: u32,
    /// Records that carry a name hash
    pub named: u32,
}

/// Parsed manifest header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestHeader {
    /// Headerless legacy manifest
    Legacy,
    /// `TSFM` manifest with advisory counts
    Extended(DeclaredCounts),
}

impl ManifestHeader {
    /// Header tag; reads as `0x4D465354` little-endian
    pub const MAGIC: [u8; 4] = *b"TSFM";

    /// Header tag as a little-endian integer
    pub const MAGIC_LE: u32 = u32::from_le_bytes(Self::MAGIC);

    /// Create an extended header
    pub const fn extended(total: u32, named: u32) -> Self {
        Self::Extended(DeclaredCounts { total, named })
    }

    /// Layout of the blocks that follow
    pub const fn layout(&self) -> ManifestLayout {
        match self {
            Self::Legacy => ManifestLayout::Legacy,
            Self::Extended(_) => ManifestLayout::Extended,
        }
    }

    /// Declared counts, if the manifest has a header
    pub const fn declared(&self) -> Option<DeclaredCounts> {
        match self {
            Self::Legacy => None,
            Self::Extended(counts) => Some(*counts),
        }
    }

    /// Size of the header in bytes
    pub const fn size(&self) -> u64 {
        match self {
            Self::Legacy => 0,
            Self::Extended(_) => 12,
        }
    }

    /// Detect and read the header
    ///
    /// Leaves the reader positioned at the first block. A stream shorter
    /// than the 4-byte tag is reported as truncated.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;

        let mut tag = [0u8; 4];
        reader
            .read_exact(&mut tag)
            .map_err(|e| RootError::from_io(e, start))?;

        if tag != Self::MAGIC {
            reader.seek(SeekFrom::Current(-4))?;
            return Ok(Self::Legacy);
        }

        let counts =
            DeclaredCounts::read_le(reader).map_err(|e| RootError::from_binrw(e, start))?;
        Ok(Self::Extended(counts))
    }

    /// Write the header; legacy manifests write nothing
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        if let Self::Extended(counts) = self {
            writer.write_all(&Self::MAGIC)?;
            counts.write_le(writer)?;
        }
        Ok(())
    }
}
