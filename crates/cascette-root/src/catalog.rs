//! Catalog assembly: one resolved, named file per FileDataID
//!
//! [`CatalogBuilder`] walks the index in ascending FileDataID order, keeps
//! the identifiers that resolve under a [`ResolvePolicy`], names them
//! through a [`NameLookup`] and files them into a folder tree. Identifiers
//! without a name are placed under `unknown\FILEDATA_<id>` and their hash is
//! remembered so callers can tell guessed paths from real ones.

use crate::{
    index::HashIndex,
    keys::FileDataId,
    listfile::NameLookup,
    resolver::{ResolvePolicy, VariantResolver},
};
use std::collections::{BTreeMap, HashSet, btree_map::Entry};
use tracing::debug;

/// Folder holding unnamed files
pub const UNKNOWN_FOLDER: &str = "unknown";

/// Placeholder path for an unnamed FileDataID
pub fn unknown_path(file_data_id: FileDataId) -> String {
    format!("{UNKNOWN_FOLDER}\\FILEDATA_{file_data_id}")
}

/// Leaf of the catalog tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFile {
    /// Last path component
    pub name: String,
    /// Full path as named
    pub path: String,
    /// Canonical hash of the identifier
    pub hash: u64,
    /// Identifier
    pub file_data_id: FileDataId,
}

/// Folder of the catalog tree; children are matched case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFolder {
    name: String,
    folders: BTreeMap<String, CatalogFolder>,
    files: BTreeMap<String, CatalogFile>,
}

impl CatalogFolder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Folder name, spelled as first seen
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sub-folders ordered by lowercase name
    pub fn folders(&self) -> impl Iterator<Item = &CatalogFolder> + '_ {
        self.folders.values()
    }

    /// Files directly in this folder ordered by lowercase name
    pub fn files(&self) -> impl Iterator<Item = &CatalogFile> + '_ {
        self.files.values()
    }

    /// Sub-folder by name, ignoring case
    pub fn folder(&self, name: &str) -> Option<&CatalogFolder> {
        self.folders.get(&name.to_lowercase())
    }

    /// File by name, ignoring case
    pub fn file(&self, name: &str) -> Option<&CatalogFile> {
        self.files.get(&name.to_lowercase())
    }

    /// Insert a file at its path; an existing file at the same path is kept
    fn insert(&mut self, path: &str, hash: u64, file_data_id: FileDataId) -> bool {
        let mut parts: Vec<&str> = split_path(path).collect();
        let Some(file_name) = parts.pop() else {
            return false;
        };

        let mut folder = self;
        for part in parts {
            folder = folder
                .folders
                .entry(part.to_lowercase())
                .or_insert_with(|| Self::new(part));
        }

        match folder.files.entry(file_name.to_lowercase()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(CatalogFile {
                    name: file_name.to_string(),
                    path: path.to_string(),
                    hash,
                    file_data_id,
                });
                true
            }
        }
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a CatalogFile>) {
        out.extend(self.files.values());
        for folder in self.folders.values() {
            folder.walk(out);
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(['\\', '/']).filter(|part| !part.is_empty())
}

/// Resolved, named view of a manifest under one policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    root: CatalogFolder,
    unknown: HashSet<u64>,
    selected: usize,
    policy: ResolvePolicy,
}

impl Catalog {
    /// Empty catalog for `policy`
    pub fn empty(policy: ResolvePolicy) -> Self {
        Self {
            root: CatalogFolder::new("root"),
            unknown: HashSet::new(),
            selected: 0,
            policy,
        }
    }

    /// Whether the hash belongs to a file filed under a placeholder path
    pub fn is_unknown(&self, hash: u64) -> bool {
        self.unknown.contains(&hash)
    }

    /// Number of files without a name
    pub fn unknown_count(&self) -> usize {
        self.unknown.len()
    }

    /// Number of identifiers that resolved under the policy
    pub const fn selected_count(&self) -> usize {
        self.selected
    }

    /// Policy the catalog was built with
    pub const fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// Root folder
    pub const fn root(&self) -> &CatalogFolder {
        &self.root
    }

    /// File by path, ignoring case and accepting either separator
    pub fn find_file(&self, path: &str) -> Option<&CatalogFile> {
        let mut parts: Vec<&str> = split_path(path).collect();
        let file_name = parts.pop()?;
        let folder = parts
            .into_iter()
            .try_fold(&self.root, |folder, part| folder.folder(part))?;
        folder.file(file_name)
    }

    /// Folder by path, ignoring case; an empty path is the root
    pub fn find_folder(&self, path: &str) -> Option<&CatalogFolder> {
        split_path(path).try_fold(&self.root, |folder, part| folder.folder(part))
    }

    /// Every file, depth first
    pub fn files(&self) -> Vec<&CatalogFile> {
        let mut out = Vec::with_capacity(self.selected);
        self.root.walk(&mut out);
        out
    }

    /// Number of files in the tree
    pub fn file_count(&self) -> usize {
        self.files().len()
    }
}

/// Builds a [`Catalog`] from an index and a name source
pub struct CatalogBuilder<'a> {
    index: &'a HashIndex,
    names: &'a dyn NameLookup,
}

impl<'a> CatalogBuilder<'a> {
    /// Create a builder over `index`, naming files through `names`
    pub fn new(index: &'a HashIndex, names: &'a dyn NameLookup) -> Self {
        Self { index, names }
    }

    /// Resolve every identifier and assemble the tree
    pub fn build(&self, policy: ResolvePolicy) -> Catalog {
        let resolver = VariantResolver::new(policy);
        let mut catalog = Catalog::empty(policy);

        for (file_data_id, entries) in self.index.iter() {
            if resolver.resolve(entries).is_empty() {
                continue;
            }
            let Some(hash) = self.index.hash_of(file_data_id) else {
                continue;
            };

            // A name without any path component counts as no name
            let name = self
                .names
                .name_of(hash)
                .filter(|name| split_path(name).next().is_some());
            let path = match name {
                Some(name) => name.to_string(),
                None => {
                    catalog.unknown.insert(hash);
                    unknown_path(file_data_id)
                }
            };

            if !catalog.root.insert(&path, hash, file_data_id) {
                debug!("FileDataID {file_data_id} shares its path with another file");
            }
            catalog.selected += 1;
        }

        debug!(
            "Catalog built: {} selected, {} unknown",
            catalog.selected,
            catalog.unknown.len()
        );
        catalog
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        flags::{ContentFlags, Locale, LocaleFlags},
        hasher::EffectiveHash,
        index::RootEntry,
        keys::ContentKey,
        listfile::NameTable,
    };
    use pretty_assertions::assert_eq;

    fn add(index: &mut HashIndex, id: u32, hash: u64, content: u32, locale: u32) {
        index
            .add(
                FileDataId::new(id),
                RootEntry::new(
                    ContentKey::from_bytes([id as u8; 16]),
                    ContentFlags::new(content),
                    LocaleFlags::new(locale),
                ),
                EffectiveHash::Name(hash),
            )
            .expect("insert");
    }

    fn enus() -> ResolvePolicy {
        ResolvePolicy::new(LocaleFlags::new(LocaleFlags::ENUS), false)
    }

    #[test]
    fn test_unknown_placeholder_path() {
        assert_eq!(unknown_path(FileDataId::new(42)), "unknown\\FILEDATA_42");
    }

    #[test]
    fn test_build_names_and_unknowns() {
        let mut index = HashIndex::new();
        add(&mut index, 1, 0x100, ContentFlags::NONE, LocaleFlags::ENUS);
        add(&mut index, 2, 0x200, ContentFlags::NONE, LocaleFlags::ENUS);
        add(&mut index, 3, 0x300, ContentFlags::NONE, LocaleFlags::DEDE);

        let mut names = NameTable::new();
        names.insert(0x100, "World\\Maps\\Azeroth\\Azeroth.wdt");

        let catalog = CatalogBuilder::new(&index, &names).build(enus());

        assert_eq!(catalog.selected_count(), 2);
        assert_eq!(catalog.unknown_count(), 1);
        assert!(catalog.is_unknown(0x200));
        assert!(!catalog.is_unknown(0x100));
        assert!(!catalog.is_unknown(0x300));

        let named = catalog
            .find_file("world/maps/azeroth/AZEROTH.WDT")
            .expect("named file");
        assert_eq!(named.name, "Azeroth.wdt");
        assert_eq!(named.file_data_id, FileDataId::new(1));

        let unknown = catalog.find_file("unknown\\FILEDATA_2").expect("placeholder");
        assert_eq!(unknown.hash, 0x200);
        assert!(catalog.find_file("unknown\\FILEDATA_3").is_none());
        assert_eq!(catalog.file_count(), 2);
    }

    #[test]
    fn test_empty_names_fall_back_to_placeholder() {
        let mut index = HashIndex::new();
        add(&mut index, 5, 0x5, ContentFlags::NONE, LocaleFlags::ENUS);
        add(&mut index, 6, 0x6, ContentFlags::NONE, LocaleFlags::ENUS);

        let names: NameTable = [(0x5, String::new()), (0x6, "\\/".to_string())]
            .into_iter()
            .collect();
        let catalog = CatalogBuilder::new(&index, &names).build(enus());

        assert_eq!(catalog.selected_count(), 2);
        assert_eq!(catalog.file_count(), 2);
        assert!(catalog.is_unknown(0x5));
        assert!(catalog.is_unknown(0x6));
        assert!(catalog.find_file("unknown\\FILEDATA_5").is_some());
        assert!(catalog.find_file("unknown\\FILEDATA_6").is_some());
    }

    #[test]
    fn test_folders_merge_case_insensitively() {
        let mut index = HashIndex::new();
        add(&mut index, 1, 0x1, ContentFlags::NONE, LocaleFlags::ENUS);
        add(&mut index, 2, 0x2, ContentFlags::NONE, LocaleFlags::ENUS);

        let names: NameTable = [
            (0x1, "Interface\\Icons\\a.blp".to_string()),
            (0x2, "INTERFACE/icons/b.blp".to_string()),
        ]
        .into_iter()
        .collect();
        let catalog = CatalogBuilder::new(&index, &names).build(enus());

        let folder = catalog.find_folder("interface\\ICONS").expect("merged folder");
        assert_eq!(folder.name(), "Icons");
        assert_eq!(folder.files().count(), 2);
        assert_eq!(catalog.root().folders().count(), 1);
        assert!(catalog.find_folder("").is_some());
    }

    #[test]
    fn test_policy_decides_selection() {
        let mut index = HashIndex::new();
        add(&mut index, 1, 0x1, ContentFlags::NONE, LocaleFlags::ENUS);
        add(&mut index, 2, 0x2, ContentFlags::NONE, LocaleFlags::FRFR);

        let names = NameTable::new();
        let builder = CatalogBuilder::new(&index, &names);

        let french = builder.build(ResolvePolicy::new(Locale::FrFr.flags(), false));
        assert_eq!(french.selected_count(), 1);
        assert!(french.is_unknown(0x2));
        assert_eq!(french.policy().locale.value(), LocaleFlags::FRFR);

        let all = LocaleFlags::new(LocaleFlags::ALL);
        let everything = builder.build(ResolvePolicy::new(all, false));
        assert_eq!(everything.selected_count(), 2);
    }

    #[test]
    fn test_files_walk_depth_first() {
        let mut index = HashIndex::new();
        add(&mut index, 1, 0x1, ContentFlags::NONE, LocaleFlags::ENUS);
        add(&mut index, 2, 0x2, ContentFlags::NONE, LocaleFlags::ENUS);
        add(&mut index, 3, 0x3, ContentFlags::NONE, LocaleFlags::ENUS);

        let names: NameTable = [
            (0x1, "b\\deep.txt".to_string()),
            (0x2, "top.txt".to_string()),
            (0x3, "a\\x.txt".to_string()),
        ]
        .into_iter()
        .collect();
        let catalog = CatalogBuilder::new(&index, &names).build(enus());

        let paths: Vec<&str> = catalog.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["top.txt", "a\\x.txt", "b\\deep.txt"]);
    }
}
