//! Dual hash index over root manifest records
//!
//! Every variant of a FileDataID is kept, in manifest order. Each identifier
//! additionally has one canonical hash, and every registered hash resolves
//! back to exactly one identifier.

use crate::{
    block::RootBlock,
    error::{Result, RootError},
    flags::{ContentFlags, LocaleFlags},
    hasher::{EffectiveHash, file_data_hash},
    keys::{ContentKey, FileDataId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, hash_map::Entry};
use tracing::{debug, warn};

/// One variant of an asset: content checksum plus the flags of its block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootEntry {
    /// Content checksum of this variant
    pub content_key: ContentKey,
    /// Content flags of the containing block
    pub content_flags: ContentFlags,
    /// Locale flags of the containing block
    pub locale_flags: LocaleFlags,
}

impl RootEntry {
    /// Create new entry
    pub const fn new(
        content_key: ContentKey,
        content_flags: ContentFlags,
        locale_flags: LocaleFlags,
    ) -> Self {
        Self {
            content_key,
            content_flags,
            locale_flags,
        }
    }

    /// Whether this variant applies to any of `locale`
    pub const fn matches_locale(&self, locale: LocaleFlags) -> bool {
        self.locale_flags.matches(locale)
    }

    /// Whether this is an alternate variant
    pub const fn is_alternate(&self) -> bool {
        self.content_flags.is_alternate()
    }
}

/// What to do when a FileDataID shows up again with a different hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep the first hash seen
    #[default]
    FirstWins,
    /// Replace the canonical hash with the latest one
    LastWins,
    /// Fail the add
    Reject,
}

/// Result of [`HashIndex::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// First record for this identifier
    Inserted,
    /// Another variant under an already known hash
    Duplicate,
    /// Different hash for a known identifier, settled by the conflict policy
    Conflict,
}

/// Counters for irregularities met while indexing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Identifiers seen with more than one hash
    pub conflicts: usize,
    /// Hashes claimed by more than one identifier
    pub collisions: usize,
}

/// FileDataID multimap with identifier→hash and hash→identifier maps
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    policy: ConflictPolicy,
    entries: BTreeMap<FileDataId, Vec<RootEntry>>,
    hash_by_id: HashMap<FileDataId, u64>,
    id_by_hash: HashMap<u64, FileDataId>,
    total_entries: usize,
    stats: IndexStats,
}

impl HashIndex {
    /// Create an empty index with the default conflict policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with the given conflict policy
    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Conflict policy in effect
    pub const fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Record one variant of `file_data_id` addressed by `hash`
    pub fn add(
        &mut self,
        file_data_id: FileDataId,
        entry: RootEntry,
        hash: EffectiveHash,
    ) -> Result<AddOutcome> {
        let incoming = hash.value();

        let Some(existing) = self.hash_by_id.get(&file_data_id).copied() else {
            self.check_links(file_data_id, hash)?;
            self.push(file_data_id, entry);
            self.hash_by_id.insert(file_data_id, incoming);
            self.link_all(file_data_id, hash);
            return Ok(AddOutcome::Inserted);
        };

        if existing == incoming || self.id_by_hash.get(&incoming) == Some(&file_data_id) {
            self.push(file_data_id, entry);
            return Ok(AddOutcome::Duplicate);
        }

        // A named variant of an identifier first seen without a name
        if existing == file_data_hash(file_data_id) && hash.is_name() {
            self.check_link(file_data_id, incoming)?;
            self.push(file_data_id, entry);
            self.link(file_data_id, incoming);
            return Ok(AddOutcome::Duplicate);
        }

        match self.policy {
            ConflictPolicy::Reject => Err(RootError::HashConflict {
                file_data_id,
                existing,
                incoming,
            }),
            ConflictPolicy::FirstWins => {
                debug!(
                    "FileDataID {file_data_id} keeps hash {existing:016x}, ignoring {incoming:016x}"
                );
                self.push(file_data_id, entry);
                self.stats.conflicts += 1;
                Ok(AddOutcome::Conflict)
            }
            ConflictPolicy::LastWins => {
                debug!(
                    "FileDataID {file_data_id} hash {existing:016x} replaced by {incoming:016x}"
                );
                self.push(file_data_id, entry);
                self.stats.conflicts += 1;
                self.unlink(file_data_id, existing);
                self.unlink(file_data_id, file_data_hash(file_data_id));
                self.hash_by_id.insert(file_data_id, incoming);
                self.link_all(file_data_id, hash);
                Ok(AddOutcome::Conflict)
            }
        }
    }

    /// Add every record of a block, returning how many were added
    pub fn add_block(&mut self, block: &RootBlock) -> Result<usize> {
        for (file_data_id, entry, hash) in block.entries() {
            self.add(file_data_id, entry, hash)?;
        }
        Ok(block.records.len())
    }

    fn push(&mut self, file_data_id: FileDataId, entry: RootEntry) {
        self.entries.entry(file_data_id).or_default().push(entry);
        self.total_entries += 1;
    }

    fn check_links(&self, file_data_id: FileDataId, hash: EffectiveHash) -> Result<()> {
        self.check_link(file_data_id, hash.value())?;
        if hash.is_name() {
            self.check_link(file_data_id, file_data_hash(file_data_id))?;
        }
        Ok(())
    }

    fn check_link(&self, file_data_id: FileDataId, hash: u64) -> Result<()> {
        if self.policy != ConflictPolicy::Reject {
            return Ok(());
        }
        match self.id_by_hash.get(&hash) {
            Some(&existing) if existing != file_data_id => Err(RootError::HashCollision {
                hash,
                existing,
                incoming: file_data_id,
            }),
            _ => Ok(()),
        }
    }

    fn link_all(&mut self, file_data_id: FileDataId, hash: EffectiveHash) {
        self.link(file_data_id, hash.value());
        if hash.is_name() {
            self.link(file_data_id, file_data_hash(file_data_id));
        }
    }

    fn link(&mut self, file_data_id: FileDataId, hash: u64) {
        match self.id_by_hash.entry(hash) {
            Entry::Vacant(slot) => {
                slot.insert(file_data_id);
            }
            Entry::Occupied(slot) if *slot.get() == file_data_id => {}
            Entry::Occupied(slot) => {
                self.stats.collisions += 1;
                warn!(
                    "Hash {hash:016x} already maps to FileDataID {}, not remapping to {file_data_id}",
                    slot.get()
                );
            }
        }
    }

    fn unlink(&mut self, file_data_id: FileDataId, hash: u64) {
        if self.id_by_hash.get(&hash) == Some(&file_data_id) {
            self.id_by_hash.remove(&hash);
        }
    }

    /// Canonical hash of an identifier
    pub fn hash_of(&self, file_data_id: FileDataId) -> Option<u64> {
        self.hash_by_id.get(&file_data_id).copied()
    }

    /// Identifier a hash resolves to
    pub fn file_data_id_of(&self, hash: u64) -> Option<FileDataId> {
        self.id_by_hash.get(&hash).copied()
    }

    /// All variants of an identifier in manifest order
    pub fn entries_of(&self, file_data_id: FileDataId) -> &[RootEntry] {
        self.entries
            .get(&file_data_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All variants of the identifier a hash resolves to
    pub fn entries_by_hash(&self, hash: u64) -> &[RootEntry] {
        self.file_data_id_of(hash)
            .map(|file_data_id| self.entries_of(file_data_id))
            .unwrap_or_default()
    }

    /// Whether the identifier is present
    pub fn exists(&self, file_data_id: FileDataId) -> bool {
        self.entries.contains_key(&file_data_id)
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of variants across all identifiers
    pub const fn total_entries(&self) -> usize {
        self.total_entries
    }

    /// Identifiers in ascending order with their variants
    pub fn iter(&self) -> impl Iterator<Item = (FileDataId, &[RootEntry])> + '_ {
        self.entries
            .iter()
            .map(|(file_data_id, entries)| (*file_data_id, entries.as_slice()))
    }

    /// Every variant paired with the canonical hash of its identifier
    pub fn all_entries(&self) -> Vec<(u64, RootEntry)> {
        let mut all = Vec::with_capacity(self.total_entries);
        for (file_data_id, entries) in &self.entries {
            if let Some(hash) = self.hash_of(*file_data_id) {
                all.extend(entries.iter().map(|entry| (hash, *entry)));
            }
        }
        all
    }

    /// Conflict and collision counters
    pub const fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Drop all content, keeping the conflict policy
    pub fn clear(&mut self) {
        *self = Self::with_policy(self.policy);
    }
}
