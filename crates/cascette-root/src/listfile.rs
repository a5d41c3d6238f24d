//! File names for catalog entries
//!
//! The catalog asks a [`NameLookup`] for the path of each canonical hash.
//! [`NameTable`] is the stock implementation, filled from a list file of
//! `<FileDataID><delimiter><path>` lines. Only identifiers present in the
//! index are accepted, and each is keyed by its canonical hash.

use crate::{error::Result, index::HashIndex, keys::FileDataId};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, ErrorKind},
    path::Path,
};
use tracing::{debug, warn};

/// Source of file names keyed by hash
pub trait NameLookup {
    /// Path for a hash, if known
    fn name_of(&self, hash: u64) -> Option<&str>;
}

impl NameLookup for HashMap<u64, String> {
    fn name_of(&self, hash: u64) -> Option<&str> {
        self.get(&hash).map(String::as_str)
    }
}

/// Line format of a list file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFileFormat {
    /// `<id> <path>`
    #[default]
    Space,
    /// `<id>;<path>`
    Csv,
}

impl ListFileFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext == "csv" => Self::Csv,
            _ => Self::Space,
        }
    }

    /// Field delimiter
    pub const fn delimiter(self) -> char {
        match self {
            Self::Space => ' ',
            Self::Csv => ';',
        }
    }
}

/// Hash to path table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: HashMap<u64, String>,
}

impl NameTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name; the first name recorded for a hash is kept
    ///
    /// Returns whether the name was stored.
    pub fn insert(&mut self, hash: u64, name: impl Into<String>) -> bool {
        match self.names.entry(hash) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(name.into());
                true
            }
        }
    }

    /// Number of names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate `(hash, name)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.names.iter().map(|(hash, name)| (*hash, name.as_str()))
    }

    /// Merge list file lines into the table
    ///
    /// Lines without a delimiter, with a non-numeric identifier, or naming
    /// an identifier absent from `index` are skipped. Invalid UTF-8 is
    /// replaced rather than failing the read. Returns the number of names
    /// stored.
    pub fn read_from<R: BufRead>(
        &mut self,
        mut reader: R,
        format: ListFileFormat,
        index: &HashIndex,
    ) -> Result<usize> {
        let delimiter = format.delimiter();
        let mut stored = 0usize;
        let mut skipped = 0usize;
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&buf);
            let line = text.trim_end_matches(['\r', '\n']);

            let Some((id, name)) = line.split_once(delimiter) else {
                skipped += 1;
                continue;
            };
            let Ok(id) = id.trim().parse::<u32>() else {
                skipped += 1;
                continue;
            };
            let Some(hash) = index.hash_of(FileDataId::new(id)) else {
                skipped += 1;
                continue;
            };

            if self.insert(hash, name) {
                stored += 1;
            }
        }

        debug!("List file: {stored} names stored, {skipped} lines skipped");
        Ok(stored)
    }

    /// Load a list file from disk
    ///
    /// A missing file leaves the table empty; the format follows the
    /// extension (see [`ListFileFormat::from_path`]).
    pub fn load(path: impl AsRef<Path>, index: &HashIndex) -> Result<Self> {
        let path = path.as_ref();
        let mut table = Self::new();

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("List file {} not found, no names loaded", path.display());
                return Ok(table);
            }
            Err(e) => return Err(e.into()),
        };

        table.read_from(BufReader::new(file), ListFileFormat::from_path(path), index)?;
        Ok(table)
    }
}

impl NameLookup for NameTable {
    fn name_of(&self, hash: u64) -> Option<&str> {
        self.names.get(&hash).map(String::as_str)
    }
}

impl FromIterator<(u64, String)> for NameTable {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (hash, name) in iter {
            table.insert(hash, name);
        }
        table
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        flags::{ContentFlags, LocaleFlags},
        hasher::EffectiveHash,
        index::RootEntry,
        keys::ContentKey,
    };
    use std::io::{Cursor, Write};

    fn index_with(ids: &[u32]) -> HashIndex {
        let mut index = HashIndex::new();
        for &id in ids {
            index
                .add(
                    FileDataId::new(id),
                    RootEntry::new(
                        ContentKey::default(),
                        ContentFlags::new(ContentFlags::NONE),
                        LocaleFlags::new(LocaleFlags::ENUS),
                    ),
                    EffectiveHash::Name(u64::from(id) << 8),
                )
                .expect("insert");
        }
        index
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ListFileFormat::from_path(Path::new("names.csv")), ListFileFormat::Csv);
        assert_eq!(ListFileFormat::from_path(Path::new("names.txt")), ListFileFormat::Space);
        assert_eq!(ListFileFormat::from_path(Path::new("names")), ListFileFormat::Space);
    }

    #[test]
    fn test_read_space_format() {
        let index = index_with(&[1, 2]);
        let input = "1 World\\Maps\\Azeroth.wdt\n2 Sound\\Music\\with space.mp3\r\n";

        let mut table = NameTable::new();
        let stored = table
            .read_from(Cursor::new(input), ListFileFormat::Space, &index)
            .expect("in-memory read");

        assert_eq!(stored, 2);
        assert_eq!(table.name_of(1 << 8), Some("World\\Maps\\Azeroth.wdt"));
        assert_eq!(table.name_of(2 << 8), Some("Sound\\Music\\with space.mp3"));
    }

    #[test]
    fn test_read_skips_bad_lines() {
        let index = index_with(&[5]);
        let input = "no-delimiter\nabc;bad\\id.txt\n99;absent.txt\n5;kept.txt\n5;ignored.txt\n";

        let mut table = NameTable::new();
        let stored = table
            .read_from(Cursor::new(input), ListFileFormat::Csv, &index)
            .expect("in-memory read");

        assert_eq!(stored, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.name_of(5 << 8), Some("kept.txt"));
    }

    #[test]
    fn test_read_survives_invalid_utf8() {
        let index = index_with(&[1, 2, 3]);
        let mut input = Vec::new();
        input.extend_from_slice(b"1;a\\good.blp\n");
        input.extend_from_slice(b"9;bad\\\xff\xfename\n");
        input.extend_from_slice(b"3;c\\\xffname.blp\n");
        input.extend_from_slice(b"2;b\\also_good.blp\n");

        let mut table = NameTable::new();
        let stored = table
            .read_from(Cursor::new(input), ListFileFormat::Csv, &index)
            .expect("invalid bytes do not fail the read");

        assert_eq!(stored, 3);
        assert_eq!(table.name_of(1 << 8), Some("a\\good.blp"));
        assert_eq!(table.name_of(2 << 8), Some("b\\also_good.blp"));
        assert_eq!(table.name_of(3 << 8), Some("c\\\u{FFFD}name.blp"));
    }

    #[test]
    fn test_load_csv_from_disk() {
        let index = index_with(&[3]);
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("listfile.csv");
        let mut file = File::create(&path).expect("create list file");
        writeln!(file, "3;Interface\\Icons\\Icon.blp").expect("write list file");
        drop(file);

        let table = NameTable::load(&path, &index).expect("load list file");
        assert_eq!(table.name_of(3 << 8), Some("Interface\\Icons\\Icon.blp"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let table = NameTable::load(dir.path().join("absent.txt"), &HashIndex::new())
            .expect("missing file tolerated");
        assert!(table.is_empty());
    }

    #[test]
    fn test_hash_map_lookup() {
        let mut names = HashMap::new();
        names.insert(7u64, "a\\b.txt".to_string());
        assert_eq!(NameLookup::name_of(&names, 7), Some("a\\b.txt"));
        assert_eq!(NameLookup::name_of(&names, 8), None);
    }

    #[test]
    fn test_first_name_wins() {
        let table: NameTable = [(1u64, "first".to_string()), (1, "second".to_string())]
            .into_iter()
            .collect();
        assert_eq!(table.name_of(1), Some("first"));
    }
}
