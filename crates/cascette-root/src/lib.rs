//! Root manifest resolution for NGDP/CASC
//!
//! The WoW root manifest maps numeric FileDataIDs to 128-bit content keys.
//! Each asset may appear several times, once per locale and platform
//! variant. This crate turns that manifest into one authoritative catalog:
//! for every FileDataID, the content to use under an active locale and
//! alternate-variant preference.
//!
//! # Pipeline
//!
//! - [`ManifestParser`] reads the optional `TSFM` header and yields blocks
//! - [`HashIndex`] keeps every variant plus FileDataID↔hash maps
//! - [`VariantResolver`] filters variants by locale and the alternate flag
//! - [`CatalogBuilder`] names resolved files through a [`NameLookup`] and
//!   files them into a folder tree, tracking unnamed ones
//! - [`WowRootHandler`] owns the index and publishes catalog snapshots
//!
//! # Usage
//!
//! ```rust,no_run
//! use cascette_root::{FileDataId, NameTable, RootConfig, RootHandler, WowRootHandler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("root.bin")?;
//! let config = RootConfig::default();
//! let handler = WowRootHandler::from_bytes(&data, &config)?;
//!
//! let names = NameTable::load("listfile.csv", handler.index())?;
//! let catalog = handler.rebuild_catalog(&names, config.resolve_policy());
//! println!("{} files, {} unnamed", catalog.selected_count(), catalog.unknown_count());
//!
//! for entry in handler.resolve(FileDataId::new(53_187)) {
//!     println!("{}", entry.content_key);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod block;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod flags;
pub mod handler;
pub mod hasher;
pub mod header;
pub mod index;
pub mod keys;
pub mod listfile;
pub mod manifest;
pub mod resolver;

pub use block::{BlockHeader, RootBlock, RootRecord, decode_deltas, encode_deltas};
pub use builder::ManifestBuilder;
pub use catalog::{Catalog, CatalogBuilder, CatalogFile, CatalogFolder};
pub use config::RootConfig;
pub use error::{Result, RootError};
pub use flags::{ContentFlags, Locale, LocaleFlags};
pub use handler::{RootHandler, WowRootHandler};
pub use hasher::{EffectiveHash, file_data_hash, name_hash};
pub use header::{ManifestHeader, ManifestLayout};
pub use index::{AddOutcome, ConflictPolicy, HashIndex, IndexStats, RootEntry};
pub use keys::{ContentKey, FileDataId};
pub use listfile::{ListFileFormat, NameLookup, NameTable};
#[cfg(feature = "parallel")]
pub use manifest::parse_blocks_parallel;
pub use manifest::{BlockSpan, ManifestParser, ManifestSummary, scan_block_spans};
pub use resolver::{ResolvePolicy, VariantResolver};
