//! Hashes used to address root manifest records
//!
//! Records are addressed by a 64-bit hash. Blocks that carry name hashes
//! supply a Jenkins96 hash of the normalized file path; blocks flagged
//! `NO_NAME_HASH` are addressed by an FNV-1a style hash of the FileDataID
//! instead (see [`file_data_hash`]).

use crate::keys::FileDataId;

/// FNV-1a 64-bit offset basis
pub const FNV_OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;

/// FNV-1a 64-bit prime
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Hash a FileDataID for records that carry no name hash
///
/// Folds the four little-endian bytes of the identifier into the FNV-1a
/// offset basis: `hash = PRIME * (byte ^ hash)`.
pub const fn file_data_hash(file_data_id: FileDataId) -> u64 {
    let bytes = file_data_id.get().to_le_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash = FNV_PRIME.wrapping_mul(bytes[i] as u64 ^ hash);
        i += 1;
    }
    hash
}

/// Hash under which a record is addressed, tagged with where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectiveHash {
    /// Name hash read from the manifest
    Name(u64),
    /// Computed with [`file_data_hash`] because the block has no name hashes
    Computed(u64),
}

impl EffectiveHash {
    /// Pick the manifest name hash when present, the computed hash otherwise
    pub const fn for_record(file_data_id: FileDataId, name_hash: Option<u64>) -> Self {
        match name_hash {
            Some(hash) => Self::Name(hash),
            None => Self::Computed(file_data_hash(file_data_id)),
        }
    }

    /// Raw hash value
    pub const fn value(self) -> u64 {
        match self {
            Self::Name(hash) | Self::Computed(hash) => hash,
        }
    }

    /// Whether the hash came from the manifest
    pub const fn is_name(self) -> bool {
        matches!(self, Self::Name(_))
    }
}

/// Jenkins96 name hash of a file path
///
/// Paths are normalized to uppercase with backslash separators before
/// hashing, so `world/maps/x.wdt` and `World\Maps\X.wdt` hash identically.
pub fn name_hash(path: &str) -> u64 {
    let normalized: Vec<u8> = path
        .bytes()
        .map(|b| if b == b'/' { b'\\' } else { b.to_ascii_uppercase() })
        .collect();

    let (c, b) = hashlittle2(&normalized);
    (u64::from(c) << 32) | u64::from(b)
}

/// Bob Jenkins' lookup3 `hashlittle2` with both seeds zero; returns `(c, b)`
fn hashlittle2(key: &[u8]) -> (u32, u32) {
    let init = 0xdead_beef_u32.wrapping_add(u32::try_from(key.len()).unwrap_or(u32::MAX));
    let (mut a, mut b, mut c) = (init, init, init);

    if key.is_empty() {
        return (c, b);
    }

    let mut rest = key;
    while rest.len() > 12 {
        a = a.wrapping_add(word(&rest[0..4]));
        b = b.wrapping_add(word(&rest[4..8]));
        c = c.wrapping_add(word(&rest[8..12]));
        mix(&mut a, &mut b, &mut c);
        rest = &rest[12..];
    }

    // Tail of 1..=12 bytes; zero padding adds nothing to the missing lanes
    let mut tail = [0u8; 12];
    tail[..rest.len()].copy_from_slice(rest);
    a = a.wrapping_add(word(&tail[0..4]));
    b = b.wrapping_add(word(&tail[4..8]));
    c = c.wrapping_add(word(&tail[8..12]));
    final_mix(&mut a, &mut b, &mut c);

    (c, b)
}

fn word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c) ^ c.rotate_left(4);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a) ^ a.rotate_left(6);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b) ^ b.rotate_left(8);
    *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c) ^ c.rotate_left(16);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a) ^ a.rotate_left(19);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b) ^ b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c = (*c ^ *b).wrapping_sub(b.rotate_left(14));
    *a = (*a ^ *c).wrapping_sub(c.rotate_left(11));
    *b = (*b ^ *a).wrapping_sub(a.rotate_left(25));
    *c = (*c ^ *b).wrapping_sub(b.rotate_left(16));
    *a = (*a ^ *c).wrapping_sub(c.rotate_left(4));
    *b = (*b ^ *a).wrapping_sub(a.rotate_left(14));
    *c = (*c ^ *b).wrapping_sub(b.rotate_left(24));
}
