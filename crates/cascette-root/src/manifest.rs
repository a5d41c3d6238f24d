//! Streaming manifest parser
//!
//! [`ManifestParser`] reads the header once and then yields one
//! [`RootBlock`] per call until the stream is exhausted. The first error
//! ends iteration, so callers that collect into an index can drop their
//! partial state and commit nothing.
//!
//! ```no_run
//! use cascette_root::ManifestParser;
//! use std::io::Cursor;
//!
//! # fn demo(bytes: Vec<u8>) -> cascette_root::Result<()> {
//! let mut parser = ManifestParser::new(Cursor::new(bytes))?;
//! for block in parser.by_ref() {
//!     let block = block?;
//!     println!("{} records", block.records.len());
//! }
//! let summary = parser.finish(false)?;
//! println!("{} blocks", summary.blocks);
//! # Ok(())
//! # }
//! ```

use crate::{
    block::{BlockHeader, RootBlock},
    error::{Result, RootError},
    header::{DeclaredCounts, ManifestHeader, ManifestLayout},
};
use binrw::BinRead;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// What a completed parse read, next to what the header announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSummary {
    /// Layout of the manifest
    pub layout: ManifestLayout,
    /// Counts announced by the header, if any
    pub declared: Option<DeclaredCounts>,
    /// Blocks read
    pub blocks: usize,
    /// Records read across all blocks
    pub records: u64,
    /// Records read that carried a name hash
    pub named_records: u64,
}

impl ManifestSummary {
    fn new(header: &ManifestHeader) -> Self {
        Self {
            layout: header.layout(),
            declared: header.declared(),
            blocks: 0,
            records: 0,
            named_records: 0,
        }
    }

    /// Tally blocks decoded outside a [`ManifestParser`]
    #[cfg(feature = "parallel")]
    pub(crate) fn from_blocks(header: &ManifestHeader, blocks: &[RootBlock]) -> Self {
        let mut summary = Self::new(header);
        for block in blocks {
            summary.record_block(block);
        }
        summary
    }

    fn record_block(&mut self, block: &RootBlock) {
        self.blocks += 1;
        self.records += block.records.len() as u64;
        self.named_records += block
            .records
            .iter()
            .filter(|record| record.name_hash.is_some())
            .count() as u64;
    }

    /// Whether the declared counts, if any, agree with what was read
    pub fn counts_match(&self) -> bool {
        self.declared.is_none_or(|declared| {
            u64::from(declared.total) == self.records
                && u64::from(declared.named) == self.named_records
        })
    }

    /// Compare declared and read counts
    ///
    /// A mismatch is only logged unless `strict` is set.
    pub fn check_declared(&self, strict: bool) -> Result<()> {
        let Some(declared) = self.declared else {
            return Ok(());
        };
        if self.counts_match() {
            return Ok(());
        }

        if strict {
            return Err(RootError::DeclaredCountMismatch {
                declared_total: declared.total,
                declared_named: declared.named,
                read_total: self.records,
                read_named: self.named_records,
            });
        }

        warn!(
            "Manifest header declares {} records ({} named) but {} ({} named) were read",
            declared.total, declared.named, self.records, self.named_records
        );
        Ok(())
    }
}

/// Block-by-block reader over a manifest stream
pub struct ManifestParser<R> {
    reader: R,
    header: ManifestHeader,
    end: u64,
    summary: ManifestSummary,
    done: bool,
}

impl<R: Read + Seek> ManifestParser<R> {
    /// Read the header and position the parser at the first block
    pub fn new(mut reader: R) -> Result<Self> {
        let header = ManifestHeader::read(&mut reader)?;

        let first_block = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(first_block))?;

        debug!(
            "Manifest layout {:?}, {} bytes of blocks",
            header.layout(),
            end.saturating_sub(first_block)
        );

        Ok(Self {
            reader,
            summary: ManifestSummary::new(&header),
            header,
            end,
            done: false,
        })
    }

    /// Parsed header
    pub const fn header(&self) -> &ManifestHeader {
        &self.header
    }

    /// Layout of the manifest
    pub const fn layout(&self) -> ManifestLayout {
        self.header.layout()
    }

    /// Counts accumulated so far
    pub const fn summary(&self) -> &ManifestSummary {
        &self.summary
    }

    /// Consume the parser and validate the declared counts
    pub fn finish(self, strict: bool) -> Result<ManifestSummary> {
        self.summary.check_declared(strict)?;
        Ok(self.summary)
    }

    fn read_next(&mut self) -> Result<Option<RootBlock>> {
        let position = self.reader.stream_position()?;
        if position >= self.end {
            return Ok(None);
        }
        let block = RootBlock::read(&mut self.reader, self.header.layout(), self.end)?;
        self.summary.record_block(&block);
        Ok(Some(block))
    }
}

impl<R: Read + Seek> Iterator for ManifestParser<R> {
    type Item = Result<RootBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read + Seek> std::iter::FusedIterator for ManifestParser<R> {}

/// Location of one block inside a manifest buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Offset of the block header
    pub offset: u64,
    /// Decoded block header
    pub header: BlockHeader,
    /// Header plus body length in bytes
    pub len: u64,
}

/// Locate every block without decoding record arrays
///
/// Headers are validated and bodies bounds-checked, so a successful scan
/// guarantees each span can be decoded independently.
pub fn scan_block_spans(data: &[u8]) -> Result<(ManifestHeader, Vec<BlockSpan>)> {
    let mut cursor = Cursor::new(data);
    let header = ManifestHeader::read(&mut cursor)?;
    let layout = header.layout();
    let end = data.len() as u64;

    let mut spans = Vec::new();
    let mut offset = cursor.position();
    while offset < end {
        if end - offset < BlockHeader::SIZE {
            return Err(RootError::Truncated { offset });
        }
        cursor.set_position(offset);
        let block_header =
            BlockHeader::read_le(&mut cursor).map_err(|e| RootError::from_binrw(e, offset))?;
        block_header.validate(offset)?;

        let len = BlockHeader::SIZE + block_header.body_len(layout);
        if end - offset < len {
            return Err(RootError::Truncated { offset });
        }

        spans.push(BlockSpan {
            offset,
            header: block_header,
            len,
        });
        offset += len;
    }

    debug!("Scanned {} block spans", spans.len());
    Ok((header, spans))
}

/// Decode all blocks concurrently, returned in manifest order
#[cfg(feature = "parallel")]
pub fn parse_blocks_parallel(data: &[u8]) -> Result<(ManifestHeader, Vec<RootBlock>)> {
    use rayon::prelude::*;

    let (header, spans) = scan_block_spans(data)?;
    let layout = header.layout();
    let end = data.len() as u64;

    let blocks = spans
        .par_iter()
        .map(|span| {
            let mut cursor = Cursor::new(data);
            cursor.set_position(span.offset);
            RootBlock::read(&mut cursor, layout, end)
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Decoded {} blocks on {} threads",
        blocks.len(),
        rayon::current_num_threads()
    );
    Ok((header, blocks))
}
