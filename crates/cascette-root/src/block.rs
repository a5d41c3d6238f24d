//! Manifest blocks: header validation, delta-coded identifiers and record arrays

use crate::{
    error::{Result, RootError},
    flags::{ContentFlags, LocaleFlags},
    hasher::EffectiveHash,
    header::ManifestLayout,
    index::RootEntry,
    keys::{ContentKey, FileDataId},
};
use binrw::{BinRead, BinWrite};
use std::io::{Read, Seek, Write};
use tracing::debug;

/// Fixed 12-byte header preceding every block
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct BlockHeader {
    /// Number of records in the block
    pub count: u32,
    /// Content flags shared by every record
    pub content_flags: ContentFlags,
    /// Locale flags shared by every record
    pub locale_flags: LocaleFlags,
}

impl BlockHeader {
    /// Encoded size in bytes
    pub const SIZE: u64 = 12;

    /// Reject headers the parser cannot interpret
    pub fn validate(&self, offset: u64) -> Result<()> {
        if self.locale_flags.is_empty() {
            return Err(RootError::InvalidLocaleFlags { offset });
        }
        if !self.content_flags.is_recognized() {
            return Err(RootError::UnknownContentFlags {
                offset,
                flags: self.content_flags.value(),
            });
        }
        Ok(())
    }

    /// Whether records of this block carry name hashes
    pub const fn has_name_hashes(&self, layout: ManifestLayout) -> bool {
        match layout {
            ManifestLayout::Legacy => true,
            ManifestLayout::Extended => self.content_flags.has_name_hashes(),
        }
    }

    /// Size of the block body (everything after the header) in bytes
    pub const fn body_len(&self, layout: ManifestLayout) -> u64 {
        let per_record = if self.has_name_hashes(layout) {
            4 + 16 + 8
        } else {
            4 + 16
        };
        self.count as u64 * per_record
    }
}

/// One record as stored in a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootRecord {
    /// Decoded identifier
    pub file_data_id: FileDataId,
    /// Content checksum
    pub content_key: ContentKey,
    /// Name hash, absent in `NO_NAME_HASH` blocks
    pub name_hash: Option<u64>,
}

impl RootRecord {
    /// Create new record
    pub const fn new(
        file_data_id: FileDataId,
        content_key: ContentKey,
        name_hash: Option<u64>,
    ) -> Self {
        Self {
            file_data_id,
            content_key,
            name_hash,
        }
    }

    /// Hash this record is addressed by
    pub const fn effective_hash(&self) -> EffectiveHash {
        EffectiveHash::for_record(self.file_data_id, self.name_hash)
    }
}

/// Block header plus its decoded records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootBlock {
    /// Block header
    pub header: BlockHeader,
    /// Records in manifest order
    pub records: Vec<RootRecord>,
}

impl RootBlock {
    /// Create an empty block
    pub const fn new(content_flags: ContentFlags, locale_flags: LocaleFlags) -> Self {
        Self {
            header: BlockHeader {
                count: 0,
                content_flags,
                locale_flags,
            },
            records: Vec::new(),
        }
    }

    /// Append a record and keep the header count in step
    pub fn add_record(&mut self, record: RootRecord) {
        self.records.push(record);
        self.header.count = u32::try_from(self.records.len()).unwrap_or(u32::MAX);
    }

    /// Content flags of the block
    pub const fn content_flags(&self) -> ContentFlags {
        self.header.content_flags
    }

    /// Locale flags of the block
    pub const fn locale_flags(&self) -> LocaleFlags {
        self.header.locale_flags
    }

    /// Variant entry for one of this block's records
    pub const fn entry(&self, record: &RootRecord) -> RootEntry {
        RootEntry::new(
            record.content_key,
            self.header.content_flags,
            self.header.locale_flags,
        )
    }

    /// Iterate records with their variant entry and effective hash
    pub fn entries(&self) -> impl Iterator<Item = (FileDataId, RootEntry, EffectiveHash)> + '_ {
        self.records
            .iter()
            .map(move |record| (record.file_data_id, self.entry(record), record.effective_hash()))
    }

    /// Read one block
    ///
    /// `end` is the stream length; the body is only read once it is known to
    /// fit, so a short stream fails with `Truncated` before any allocation.
    pub fn read<R: Read + Seek>(reader: &mut R, layout: ManifestLayout, end: u64) -> Result<Self> {
        let offset = reader.stream_position()?;
        if end.saturating_sub(offset) < BlockHeader::SIZE {
            return Err(RootError::Truncated { offset });
        }

        let header = BlockHeader::read_le(reader).map_err(|e| RootError::from_binrw(e, offset))?;
        header.validate(offset)?;

        let body_start = offset + BlockHeader::SIZE;
        if end.saturating_sub(body_start) < header.body_len(layout) {
            return Err(RootError::Truncated { offset });
        }

        debug!(
            "Block at {offset}: {} records, content {}, locale {}",
            header.count, header.content_flags, header.locale_flags
        );

        let records = read_records(reader, &header, layout)
            .map_err(|e| RootError::from_binrw(e, offset))?;
        Ok(Self { header, records })
    }

    /// Write the block in the given layout
    ///
    /// Records without a name hash are written with their computed hash when
    /// the block carries name hashes.
    pub fn write<W: Write + Seek>(&self, writer: &mut W, layout: ManifestLayout) -> Result<()> {
        let header = BlockHeader {
            count: u32::try_from(self.records.len()).unwrap_or(u32::MAX),
            ..self.header
        };
        header.write_le(writer)?;

        let ids: Vec<FileDataId> = self.records.iter().map(|r| r.file_data_id).collect();
        for delta in encode_deltas(&ids) {
            delta.write_le(writer)?;
        }

        let named = header.has_name_hashes(layout);
        match layout {
            ManifestLayout::Legacy => {
                for record in &self.records {
                    record.content_key.write_le(writer)?;
                    record.effective_hash().value().write_le(writer)?;
                }
            }
            ManifestLayout::Extended => {
                for record in &self.records {
                    record.content_key.write_le(writer)?;
                }
                if named {
                    for record in &self.records {
                        record.effective_hash().value().write_le(writer)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_records<R: Read + Seek>(
    reader: &mut R,
    header: &BlockHeader,
    layout: ManifestLayout,
) -> binrw::BinResult<Vec<RootRecord>> {
    let count = header.count as usize;

    let mut deltas = Vec::with_capacity(count);
    for _ in 0..count {
        deltas.push(u32::read_le(reader)?);
    }
    let ids = decode_deltas(&deltas);

    let mut records = Vec::with_capacity(count);
    match layout {
        ManifestLayout::Legacy => {
            for file_data_id in ids {
                let content_key = ContentKey::read_le(reader)?;
                let name_hash = u64::read_le(reader)?;
                records.push(RootRecord::new(file_data_id, content_key, Some(name_hash)));
            }
        }
        ManifestLayout::Extended => {
            let mut keys = Vec::with_capacity(count);
            for _ in 0..count {
                keys.push(ContentKey::read_le(reader)?);
            }

            let mut hashes = Vec::with_capacity(count);
            if header.has_name_hashes(layout) {
                for _ in 0..count {
                    hashes.push(Some(u64::read_le(reader)?));
                }
            } else {
                hashes.resize(count, None);
            }

            records.extend(
                ids.into_iter()
                    .zip(keys)
                    .zip(hashes)
                    .map(|((id, key), hash)| RootRecord::new(id, key, hash)),
            );
        }
    }
    Ok(records)
}

/// Decode block-relative deltas: `id = cursor + delta`, then `cursor = id + 1`
pub fn decode_deltas(deltas: &[u32]) -> Vec<FileDataId> {
    let mut cursor: u32 = 0;
    deltas
        .iter()
        .map(|&delta| {
            let id = cursor.wrapping_add(delta);
            cursor = id.wrapping_add(1);
            FileDataId::new(id)
        })
        .collect()
}

/// Inverse of [`decode_deltas`]
pub fn encode_deltas(ids: &[FileDataId]) -> Vec<u32> {
    let mut cursor: u32 = 0;
    ids.iter()
        .map(|id| {
            let delta = id.get().wrapping_sub(cursor);
            cursor = id.get().wrapping_add(1);
            delta
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hasher::file_data_hash;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn ids(raw: &[u32]) -> Vec<FileDataId> {
        raw.iter().copied().map(FileDataId::new).collect()
    }

    fn key(byte: u8) -> ContentKey {
        ContentKey::from_bytes([byte; 16])
    }

    fn block_bytes(header: BlockHeader, body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        header
            .write_le(&mut Cursor::new(&mut data))
            .expect("in-memory write");
        data.extend_from_slice(body);
        data
    }

    fn read_block(data: &[u8], layout: ManifestLayout) -> Result<RootBlock> {
        RootBlock::read(&mut Cursor::new(data), layout, data.len() as u64)
    }

    #[test]
    fn test_decode_deltas() {
        assert_eq!(decode_deltas(&[5, 0, 13]), ids(&[5, 6, 20]));
        assert_eq!(decode_deltas(&[5, 0, 14]), ids(&[5, 6, 21]));
        assert_eq!(decode_deltas(&[]), Vec::<FileDataId>::new());
    }

    #[test]
    fn test_decode_deltas_wraps() {
        assert_eq!(decode_deltas(&[u32::MAX, 0]), ids(&[u32::MAX, 0]));
    }

    #[test]
    fn test_encode_deltas() {
        assert_eq!(encode_deltas(&ids(&[5, 6, 20])), vec![5, 0, 13]);
    }

    #[test]
    fn test_validate_rejects_empty_locale() {
        let header = BlockHeader {
            count: 1,
            content_flags: ContentFlags::new(ContentFlags::NONE),
            locale_flags: LocaleFlags::new(0),
        };
        assert!(matches!(
            header.validate(8),
            Err(RootError::InvalidLocaleFlags { offset: 8 })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_content_flags() {
        let header = BlockHeader {
            count: 1,
            content_flags: ContentFlags::new(ContentFlags::DO_NOT_LOAD),
            locale_flags: LocaleFlags::new(LocaleFlags::ENUS),
        };
        assert!(matches!(
            header.validate(0),
            Err(RootError::UnknownContentFlags { offset: 0, flags: 0x100 })
        ));
    }

    #[test]
    fn test_body_len() {
        let mut header = BlockHeader {
            count: 3,
            content_flags: ContentFlags::new(ContentFlags::NO_NAME_HASH),
            locale_flags: LocaleFlags::new(LocaleFlags::ENUS),
        };
        assert_eq!(header.body_len(ManifestLayout::Extended), 60);
        assert_eq!(header.body_len(ManifestLayout::Legacy), 84);

        header.content_flags = ContentFlags::new(ContentFlags::NONE);
        assert_eq!(header.body_len(ManifestLayout::Extended), 84);
    }

    #[test]
    fn test_read_legacy_block_interleaved() {
        let header = BlockHeader {
            count: 2,
            content_flags: ContentFlags::new(ContentFlags::LOAD_ON_WINDOWS),
            locale_flags: LocaleFlags::new(LocaleFlags::ENUS),
        };
        let mut body = Vec::new();
        body.extend_from_slice(&10u32.to_le_bytes());
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&[0x11; 16]);
        body.extend_from_slice(&0xAAu64.to_le_bytes());
        body.extend_from_slice(&[0x22; 16]);
        body.extend_from_slice(&0xBBu64.to_le_bytes());
        let data = block_bytes(header, &body);

        let block = read_block(&data, ManifestLayout::Legacy).expect("valid block");

        assert_eq!(
            block.records,
            vec![
                RootRecord::new(FileDataId::new(10), key(0x11), Some(0xAA)),
                RootRecord::new(FileDataId::new(12), key(0x22), Some(0xBB)),
            ]
        );
    }

    #[test]
    fn test_read_extended_block_without_names() {
        let header = BlockHeader {
            count: 2,
            content_flags: ContentFlags::new(ContentFlags::NO_NAME_HASH),
            locale_flags: LocaleFlags::new(LocaleFlags::DEDE),
        };
        let mut body = Vec::new();
        body.extend_from_slice(&7u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&[0x33; 16]);
        body.extend_from_slice(&[0x44; 16]);
        let data = block_bytes(header, &body);

        let block = read_block(&data, ManifestLayout::Extended).expect("valid block");

        assert_eq!(block.records.len(), 2);
        assert_eq!(block.records[1].file_data_id, FileDataId::new(8));
        assert_eq!(block.records[1].name_hash, None);
        assert_eq!(
            block.records[1].effective_hash(),
            EffectiveHash::Computed(file_data_hash(FileDataId::new(8)))
        );

        let (id, entry, _) = block.entries().next().expect("two records");
        assert_eq!(id, FileDataId::new(7));
        assert_eq!(entry.content_key, key(0x33));
        assert_eq!(entry.locale_flags.value(), LocaleFlags::DEDE);
    }

    #[test]
    fn test_read_short_body_is_truncated() {
        let header = BlockHeader {
            count: 4,
            content_flags: ContentFlags::new(ContentFlags::NONE),
            locale_flags: LocaleFlags::new(LocaleFlags::ENUS),
        };
        let data = block_bytes(header, &[0u8; 20]);
        let err = read_block(&data, ManifestLayout::Extended).expect_err("short body");
        assert!(matches!(err, RootError::Truncated { offset: 0 }));
    }

    #[test]
    fn test_write_fills_missing_name_hash() {
        let mut block = RootBlock::new(
            ContentFlags::new(ContentFlags::NONE),
            LocaleFlags::new(LocaleFlags::ENUS),
        );
        block.add_record(RootRecord::new(FileDataId::new(3), key(1), None));
        assert_eq!(block.header.count, 1);

        let mut data = Vec::new();
        block
            .write(&mut Cursor::new(&mut data), ManifestLayout::Extended)
            .expect("in-memory write");
        assert_eq!(data.len(), 12 + 28);

        let read = read_block(&data, ManifestLayout::Extended).expect("valid block");
        assert_eq!(
            read.records[0].name_hash,
            Some(file_data_hash(FileDataId::new(3)))
        );
    }

    proptest! {
        #[test]
        fn prop_deltas_round_trip(mut raw in proptest::collection::vec(any::<u32>(), 0..64)) {
            raw.sort_unstable();
            raw.dedup();
            let original = ids(&raw);
            prop_assert_eq!(decode_deltas(&encode_deltas(&original)), original);
        }

        #[test]
        fn prop_decoded_ids_strictly_increase(
            deltas in proptest::collection::vec(0u32..1000, 1..64)
        ) {
            let decoded = decode_deltas(&deltas);
            for pair in decoded.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
