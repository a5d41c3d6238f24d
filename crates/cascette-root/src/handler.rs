//! Root handler: parsed index plus the current catalog snapshot
//!
//! The index is built once per parse and never mutated afterwards, so a
//! catalog rebuild only reads it. The finished catalog is published by
//! swapping one `Arc`; readers holding the previous snapshot keep using it.
//! Each rebuild takes a generation number when it starts, and a snapshot
//! only replaces one from an older generation.

use crate::{
    catalog::{Catalog, CatalogBuilder},
    config::RootConfig,
    error::Result,
    hasher::name_hash,
    index::{HashIndex, RootEntry},
    keys::FileDataId,
    listfile::{NameLookup, NameTable},
    manifest::{ManifestParser, ManifestSummary},
    resolver::{ResolvePolicy, VariantResolver},
};
use parking_lot::RwLock;
use std::{
    io::{Cursor, Read, Seek},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::{debug, info};

/// Capabilities shared by root manifest handlers
pub trait RootHandler {
    /// Parse a manifest into a new handler
    fn parse<R: Read + Seek>(reader: R, config: &RootConfig) -> Result<Self>
    where
        Self: Sized;

    /// Entries of an identifier that apply under the current policy
    fn resolve(&self, file_data_id: FileDataId) -> Vec<RootEntry>;

    /// Build a catalog without publishing it
    fn build_catalog(&self, names: &dyn NameLookup, policy: ResolvePolicy) -> Catalog;
}

/// Published catalog and the rebuild generation it came from
#[derive(Debug)]
struct Snapshot {
    generation: u64,
    catalog: Arc<Catalog>,
}

/// Handler for WoW root manifests
#[derive(Debug)]
pub struct WowRootHandler {
    config: RootConfig,
    index: HashIndex,
    summary: ManifestSummary,
    current: RwLock<Snapshot>,
    next_generation: AtomicU64,
}

impl WowRootHandler {
    fn from_parts(config: RootConfig, index: HashIndex, summary: ManifestSummary) -> Self {
        let catalog = CatalogBuilder::new(&index, &NameTable::new()).build(config.resolve_policy());
        info!(
            "Root manifest indexed: {} blocks, {} records, {} FileDataIDs, {} unknown",
            summary.blocks,
            summary.records,
            index.len(),
            catalog.unknown_count()
        );
        Self {
            config,
            index,
            summary,
            current: RwLock::new(Snapshot {
                generation: 0,
                catalog: Arc::new(catalog),
            }),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Parse a manifest held in memory
    pub fn from_bytes(data: &[u8], config: &RootConfig) -> Result<Self> {
        Self::parse(Cursor::new(data), config)
    }

    /// Parse a manifest held in memory, decoding blocks on the rayon pool
    ///
    /// Blocks are merged into the index in manifest order, so the result is
    /// the same as [`Self::from_bytes`].
    #[cfg(feature = "parallel")]
    pub fn from_bytes_parallel(data: &[u8], config: &RootConfig) -> Result<Self> {
        info!("Parsing root manifest ({} bytes, parallel)", data.len());
        let (header, blocks) = crate::manifest::parse_blocks_parallel(data)?;

        let mut index = HashIndex::with_policy(config.conflict_policy);
        for block in &blocks {
            index.add_block(block)?;
        }

        let summary = ManifestSummary::from_blocks(&header, &blocks);
        summary.check_declared(config.strict_counts)?;
        Ok(Self::from_parts(*config, index, summary))
    }

    /// What the parse read
    pub const fn summary(&self) -> &ManifestSummary {
        &self.summary
    }

    /// Underlying index
    pub const fn index(&self) -> &HashIndex {
        &self.index
    }

    /// Configuration the handler was parsed with
    pub const fn config(&self) -> &RootConfig {
        &self.config
    }

    /// Distinct FileDataIDs
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Variants across all FileDataIDs
    pub const fn count_total(&self) -> usize {
        self.index.total_entries()
    }

    /// Unnamed files in the current catalog
    pub fn count_unknown(&self) -> usize {
        self.current.read().catalog.unknown_count()
    }

    /// Files selected into the current catalog
    pub fn count_select(&self) -> usize {
        self.current.read().catalog.selected_count()
    }

    /// Every variant paired with its canonical hash
    pub fn all_entries(&self) -> Vec<(u64, RootEntry)> {
        self.index.all_entries()
    }

    /// Every variant of the FileDataID a hash resolves to
    pub fn all_entries_by_hash(&self, hash: u64) -> &[RootEntry] {
        self.index.entries_by_hash(hash)
    }

    /// Variants of the FileDataID a hash resolves to, under the current policy
    pub fn entries_by_hash(&self, hash: u64) -> Vec<RootEntry> {
        self.resolver().resolve(self.index.entries_by_hash(hash))
    }

    /// Every variant of a FileDataID
    pub fn all_entries_by_file_data_id(&self, file_data_id: FileDataId) -> &[RootEntry] {
        self.index.entries_of(file_data_id)
    }

    /// Variants of a FileDataID under the current policy
    pub fn entries_by_file_data_id(&self, file_data_id: FileDataId) -> Vec<RootEntry> {
        self.resolve(file_data_id)
    }

    /// Whether the FileDataID is in the manifest
    pub fn file_exists(&self, file_data_id: FileDataId) -> bool {
        self.index.exists(file_data_id)
    }

    /// Canonical hash of a FileDataID
    pub fn hash_by_file_data_id(&self, file_data_id: FileDataId) -> Option<u64> {
        self.index.hash_of(file_data_id)
    }

    /// FileDataID a hash resolves to
    pub fn file_data_id_by_hash(&self, hash: u64) -> Option<FileDataId> {
        self.index.file_data_id_of(hash)
    }

    /// FileDataID of a path, via its name hash
    pub fn file_data_id_by_name(&self, path: &str) -> Option<FileDataId> {
        self.index.file_data_id_of(name_hash(path))
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read().catalog)
    }

    /// Build a catalog and make it the current snapshot
    ///
    /// When rebuilds overlap, the one started last is published. An older
    /// rebuild that finishes later still returns its catalog but leaves the
    /// current snapshot alone.
    pub fn rebuild_catalog(&self, names: &dyn NameLookup, policy: ResolvePolicy) -> Arc<Catalog> {
        let generation = self.reserve_generation();
        let catalog = Arc::new(self.build_catalog(names, policy));

        if self.publish(generation, Arc::clone(&catalog)) {
            info!(
                "Catalog published: {} selected, {} unknown, locale {}",
                catalog.selected_count(),
                catalog.unknown_count(),
                policy.locale
            );
        } else {
            debug!("Catalog rebuild {generation} superseded by a newer rebuild");
        }
        catalog
    }

    fn reserve_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Swap in `catalog` unless a newer generation is already published
    fn publish(&self, generation: u64, catalog: Arc<Catalog>) -> bool {
        let mut current = self.current.write();
        if generation <= current.generation {
            return false;
        }
        *current = Snapshot {
            generation,
            catalog,
        };
        true
    }

    /// Whether the hash is unnamed in the current catalog
    pub fn is_unknown_file(&self, hash: u64) -> bool {
        self.current.read().catalog.is_unknown(hash)
    }

    /// Release the index and reset the catalog
    pub fn clear(&mut self) {
        self.index.clear();
        let current = self.current.get_mut();
        current.catalog = Arc::new(Catalog::empty(current.catalog.policy()));
    }

    fn resolver(&self) -> VariantResolver {
        VariantResolver::new(self.current.read().catalog.policy())
    }
}

impl RootHandler for WowRootHandler {
    fn parse<R: Read + Seek>(reader: R, config: &RootConfig) -> Result<Self> {
        info!("Parsing root manifest (locale {})", config.locale);

        let mut parser = ManifestParser::new(reader)?;
        let mut index = HashIndex::with_policy(config.conflict_policy);
        for block in parser.by_ref() {
            index.add_block(&block?)?;
        }
        let summary = parser.finish(config.strict_counts)?;

        Ok(Self::from_parts(*config, index, summary))
    }

    fn resolve(&self, file_data_id: FileDataId) -> Vec<RootEntry> {
        self.resolver().resolve(self.index.entries_of(file_data_id))
    }

    fn build_catalog(&self, names: &dyn NameLookup, policy: ResolvePolicy) -> Catalog {
        CatalogBuilder::new(&self.index, names).build(policy)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        block::RootRecord,
        builder::ManifestBuilder,
        error::RootError,
        flags::{ContentFlags, Locale, LocaleFlags},
        hasher::file_data_hash,
        header::ManifestLayout,
        keys::ContentKey,
    };
    use pretty_assertions::assert_eq;

    const MAP_PATH: &str = "World\\Maps\\Azeroth\\Azeroth.wdt";

    fn manifest() -> Vec<u8> {
        let mut builder = ManifestBuilder::new(ManifestLayout::Extended);
        let enus = LocaleFlags::new(LocaleFlags::ENUS);
        builder.add_file(
            FileDataId::new(100),
            ContentKey::from_data(b"map"),
            Some(MAP_PATH),
            ContentFlags::new(ContentFlags::LOAD_ON_WINDOWS),
            enus,
        );
        builder.add_file(
            FileDataId::new(100),
            ContentKey::from_data(b"map-alt"),
            Some(MAP_PATH),
            ContentFlags::new(ContentFlags::ALTERNATE),
            enus,
        );
        let nameless = builder.block(
            ContentFlags::new(ContentFlags::NO_NAME_HASH),
            LocaleFlags::new(LocaleFlags::ENUS | LocaleFlags::DEDE),
        );
        builder.add_record(
            nameless,
            RootRecord::new(FileDataId::new(200), ContentKey::from_data(b"sound"), None),
        );
        builder.build().expect("in-memory build")
    }

    fn parsed() -> WowRootHandler {
        WowRootHandler::from_bytes(&manifest(), &RootConfig::default()).expect("valid manifest")
    }

    #[test]
    fn test_parse_and_query() {
        let handler = parsed();

        assert_eq!(handler.count(), 2);
        assert_eq!(handler.count_total(), 3);
        assert_eq!(handler.summary().blocks, 3);
        assert!(handler.file_exists(FileDataId::new(200)));
        assert_eq!(handler.file_data_id_by_name(MAP_PATH), Some(FileDataId::new(100)));
        assert_eq!(
            handler.file_data_id_by_name("world/maps/azeroth/azeroth.wdt"),
            Some(FileDataId::new(100))
        );
        assert_eq!(
            handler.hash_by_file_data_id(FileDataId::new(200)),
            Some(file_data_hash(FileDataId::new(200)))
        );
        assert_eq!(handler.all_entries_by_file_data_id(FileDataId::new(100)).len(), 2);
        assert_eq!(handler.all_entries().len(), 3);
    }

    #[test]
    fn test_resolve_honours_override() {
        let handler = parsed();
        let resolved = handler.resolve(FileDataId::new(100));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].content_key, ContentKey::from_data(b"map"));

        let config = RootConfig::default().with_override_archive(true);
        let handler = WowRootHandler::from_bytes(&manifest(), &config).expect("valid manifest");
        let hash = handler.hash_by_file_data_id(FileDataId::new(100)).expect("known id");
        let resolved = handler.entries_by_hash(hash);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].content_key, ContentKey::from_data(b"map-alt"));
        assert_eq!(handler.all_entries_by_hash(hash).len(), 2);
    }

    #[test]
    fn test_initial_catalog_has_no_names() {
        let handler = parsed();
        assert_eq!(handler.count_select(), 2);
        assert_eq!(handler.count_unknown(), 2);
    }

    #[test]
    fn test_rebuild_publishes_new_snapshot() {
        let handler = parsed();
        let before = handler.catalog();

        let mut names = NameTable::new();
        let hash = handler.hash_by_file_data_id(FileDataId::new(100)).expect("known id");
        names.insert(hash, MAP_PATH);

        let after = handler.rebuild_catalog(&names, handler.config().resolve_policy());
        assert_eq!(after.unknown_count(), 1);
        assert!(!handler.is_unknown_file(hash));
        assert!(before.is_unknown(hash));
        assert!(Arc::ptr_eq(&after, &handler.catalog()));
    }

    #[test]
    fn test_older_rebuild_does_not_replace_newer() {
        let handler = parsed();
        let older = handler.reserve_generation();
        let newer = handler.reserve_generation();

        let german = ResolvePolicy::new(Locale::DeDe.flags(), false);
        let english = handler.config().resolve_policy();
        let names = NameTable::new();

        assert!(handler.publish(newer, Arc::new(handler.build_catalog(&names, german))));
        assert!(!handler.publish(older, Arc::new(handler.build_catalog(&names, english))));

        assert_eq!(handler.catalog().policy(), german);
        assert_eq!(handler.count_select(), 1);

        let latest = handler.rebuild_catalog(&names, english);
        assert!(Arc::ptr_eq(&latest, &handler.catalog()));
    }

    #[test]
    fn test_rebuild_with_other_locale() {
        let handler = parsed();
        let german = ResolvePolicy::new(Locale::DeDe.flags(), false);
        handler.rebuild_catalog(&NameTable::new(), german);

        assert_eq!(handler.count_select(), 1);
        assert!(handler.resolve(FileDataId::new(100)).is_empty());
        assert_eq!(handler.entries_by_file_data_id(FileDataId::new(200)).len(), 1);
    }

    #[test]
    fn test_parse_failure_commits_nothing() {
        let mut data = manifest();
        data[20..24].copy_from_slice(&0u32.to_le_bytes());
        let err = WowRootHandler::from_bytes(&data, &RootConfig::default())
            .expect_err("zero locale flags");
        assert!(err.is_format_error());
    }

    #[test]
    fn test_strict_counts() {
        let mut data = manifest();
        data[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(WowRootHandler::from_bytes(&data, &RootConfig::default()).is_ok());

        let strict = RootConfig::default().with_strict_counts(true);
        assert!(matches!(
            WowRootHandler::from_bytes(&data, &strict),
            Err(RootError::DeclaredCountMismatch { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let mut handler = parsed();
        handler.clear();
        assert_eq!(handler.count(), 0);
        assert_eq!(handler.count_select(), 0);
        assert!(!handler.file_exists(FileDataId::new(100)));
    }

    #[test]
    fn test_handler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WowRootHandler>();
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_parse_matches() {
        let data = manifest();
        let config = RootConfig::default();
        let sequential = WowRootHandler::from_bytes(&data, &config).expect("valid manifest");
        let parallel = WowRootHandler::from_bytes_parallel(&data, &config).expect("valid manifest");
        assert_eq!(parallel.all_entries(), sequential.all_entries());
        assert_eq!(parallel.summary(), sequential.summary());
    }
}
