//! Manifest writer
//!
//! Produces legacy or extended manifests from records grouped into blocks.
//! Blocks are written in creation order; records inside a block are sorted
//! by FileDataID so the delta coding stays small.

use crate::{
    block::{RootBlock, RootRecord},
    error::Result,
    flags::{ContentFlags, LocaleFlags},
    hasher::name_hash,
    header::{ManifestHeader, ManifestLayout},
    keys::{ContentKey, FileDataId},
};
use std::io::Cursor;

/// Handle to a block created by [`ManifestBuilder::block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle(usize);

/// Builder for root manifests
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    layout: ManifestLayout,
    blocks: Vec<RootBlock>,
}

impl ManifestBuilder {
    /// Create new builder for the given layout
    pub const fn new(layout: ManifestLayout) -> Self {
        Self {
            layout,
            blocks: Vec::new(),
        }
    }

    /// Start a new block, even if one with the same flags exists
    pub fn block(&mut self, content_flags: ContentFlags, locale_flags: LocaleFlags) -> BlockHandle {
        self.blocks.push(RootBlock::new(content_flags, locale_flags));
        BlockHandle(self.blocks.len() - 1)
    }

    /// Add a record to a block previously returned by [`Self::block`]
    pub fn add_record(&mut self, block: BlockHandle, record: RootRecord) {
        if let Some(block) = self.blocks.get_mut(block.0) {
            block.add_record(record);
        }
    }

    /// Add a file to the first block with matching flags, creating it if needed
    ///
    /// The name hash is derived from `path` when one is given.
    pub fn add_file(
        &mut self,
        file_data_id: FileDataId,
        content_key: ContentKey,
        path: Option<&str>,
        content_flags: ContentFlags,
        locale_flags: LocaleFlags,
    ) {
        let existing = self
            .blocks
            .iter()
            .position(|b| b.content_flags() == content_flags && b.locale_flags() == locale_flags);
        let handle = match existing {
            Some(index) => BlockHandle(index),
            None => self.block(content_flags, locale_flags),
        };

        let record = RootRecord::new(file_data_id, content_key, path.map(name_hash));
        self.add_record(handle, record);
    }

    /// Number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of records across all blocks
    pub fn record_count(&self) -> usize {
        self.blocks.iter().map(|b| b.records.len()).sum()
    }

    /// Header matching the current contents
    pub fn header(&self) -> ManifestHeader {
        match self.layout {
            ManifestLayout::Legacy => ManifestHeader::Legacy,
            ManifestLayout::Extended => {
                let total = self.record_count();
                let named: usize = self
                    .blocks
                    .iter()
                    .filter(|b| b.header.has_name_hashes(self.layout))
                    .map(|b| b.records.len())
                    .sum();
                ManifestHeader::extended(
                    u32::try_from(total).unwrap_or(u32::MAX),
                    u32::try_from(named).unwrap_or(u32::MAX),
                )
            }
        }
    }

    /// Serialize the manifest
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut cursor = Cursor::new(&mut output);

        self.header().write(&mut cursor)?;
        for block in &self.blocks {
            let mut sorted = block.clone();
            sorted.records.sort_by_key(|r| r.file_data_id);
            sorted.write(&mut cursor, self.layout)?;
        }

        Ok(output)
    }
}
