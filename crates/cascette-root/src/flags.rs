//! Content and locale flags for root manifest blocks

use binrw::{BinRead, BinWrite};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content flags describe the build, platform and storage traits of a block
#[derive(BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[brw(little)]
pub struct ContentFlags(pub u32);

impl ContentFlags {
    /// No special flags
    pub const NONE: u32 = 0x0000_0000;

    /// Seen on `.wlm` files (bit 0)
    pub const UNK_00000001: u32 = 0x0000_0001;

    /// Unknown (bit 1)
    pub const UNK_00000002: u32 = 0x0000_0002;

    /// Unknown (bit 2)
    pub const UNK_00000004: u32 = 0x0000_0004;

    /// Windows platform (bit 3)
    pub const LOAD_ON_WINDOWS: u32 = 0x0000_0008;

    /// macOS platform (bit 4)
    pub const LOAD_ON_MACOS: u32 = 0x0000_0010;

    /// Alternate variant replacing the default build, mostly region specific models (bit 7)
    pub const ALTERNATE: u32 = 0x0000_0080;

    /// Not loaded by the client (bit 8)
    pub const DO_NOT_LOAD: u32 = 0x0000_0100;

    /// Update plugin files (bit 11)
    pub const UPDATE_PLUGIN: u32 = 0x0000_0800;

    /// Unknown (bit 17)
    pub const UNK_00020000: u32 = 0x0002_0000;

    /// Unknown (bit 18)
    pub const UNK_00040000: u32 = 0x0004_0000;

    /// Unknown (bit 19)
    pub const UNK_00080000: u32 = 0x0008_0000;

    /// Unknown (bit 20)
    pub const UNK_00100000: u32 = 0x0010_0000;

    /// Unknown (bit 21)
    pub const UNK_00200000: u32 = 0x0020_0000;

    /// Unknown (bit 22)
    pub const UNK_00400000: u32 = 0x0040_0000;

    /// Unknown (bit 23)
    pub const UNK_00800000: u32 = 0x0080_0000;

    /// Unknown (bit 25)
    pub const UNK_02000000: u32 = 0x0200_0000;

    /// Unknown (bit 26)
    pub const UNK_04000000: u32 = 0x0400_0000;

    /// Encrypted content (bit 27)
    pub const ENCRYPTED: u32 = 0x0800_0000;

    /// Block carries no name hashes (bit 28)
    pub const NO_NAME_HASH: u32 = 0x1000_0000;

    /// Used by many cinematics (bit 29)
    pub const UNK_20000000: u32 = 0x2000_0000;

    /// Bundled file (bit 30)
    pub const BUNDLE: u32 = 0x4000_0000;

    /// No compression applied (bit 31)
    pub const NO_COMPRESSION: u32 = 0x8000_0000;

    /// Bits that identify a block shape this parser understands
    ///
    /// A non-zero flags word must intersect this mask; anything else is
    /// treated as an unknown block layout.
    pub const RECOGNIZED: u32 = Self::UNK_00000001
        | Self::LOAD_ON_WINDOWS
        | Self::LOAD_ON_MACOS
        | Self::ALTERNATE
        | Self::UNK_00020000
        | Self::UNK_00080000
        | Self::UNK_00100000
        | Self::UNK_00400000
        | Self::UNK_02000000
        | Self::NO_COMPRESSION
        | Self::NO_NAME_HASH
        | Self::UNK_20000000;

    /// Create new content flags from raw value
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get raw value
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Check if flag is set
    pub const fn has(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Set flag
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    /// Clear flag
    pub fn clear(&mut self, flag: u32) {
        self.0 &= !flag;
    }

    /// Check if name hashes are present (extended layout)
    pub const fn has_name_hashes(&self) -> bool {
        !self.has(Self::NO_NAME_HASH)
    }

    /// Check if this is an alternate variant
    pub const fn is_alternate(&self) -> bool {
        self.has(Self::ALTERNATE)
    }

    /// Zero, or intersecting [`Self::RECOGNIZED`]
    pub const fn is_recognized(&self) -> bool {
        self.0 == Self::NONE || self.has(Self::RECOGNIZED)
    }
}

impl fmt::Display for ContentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for ContentFlags {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// Locale flags indicate which game locales a block applies to
#[derive(
    BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[brw(little)]
#[serde(transparent)]
pub struct LocaleFlags(pub u32);

impl LocaleFlags {
    /// No locale; invalid in a manifest block
    pub const NONE: u32 = 0x0000_0000;

    /// All locales
    pub const ALL: u32 = 0xFFFF_FFFF;

    /// English (United States)
    pub const ENUS: u32 = 0x0000_0002;

    /// Korean
    pub const KOKR: u32 = 0x0000_0004;

    /// French (France)
    pub const FRFR: u32 = 0x0000_0010;

    /// German (Germany)
    pub const DEDE: u32 = 0x0000_0020;

    /// Chinese (China)
    pub const ZHCN: u32 = 0x0000_0040;

    /// Spanish (Spain)
    pub const ESES: u32 = 0x0000_0080;

    /// Chinese (Taiwan)
    pub const ZHTW: u32 = 0x0000_0100;

    /// English (Great Britain)
    pub const ENGB: u32 = 0x0000_0200;

    /// English (China)
    pub const ENCN: u32 = 0x0000_0400;

    /// English (Taiwan)
    pub const ENTW: u32 = 0x0000_0800;

    /// Spanish (Mexico)
    pub const ESMX: u32 = 0x0000_1000;

    /// Russian
    pub const RURU: u32 = 0x0000_2000;

    /// Portuguese (Brazil)
    pub const PTBR: u32 = 0x0000_4000;

    /// Italian (Italy)
    pub const ITIT: u32 = 0x0000_8000;

    /// Portuguese (Portugal)
    pub const PTPT: u32 = 0x0001_0000;

    /// English (Singapore)
    pub const ENSG: u32 = 0x2000_0000;

    /// Polish
    pub const PLPL: u32 = 0x4000_0000;

    /// Every locale shipped by retail WoW
    pub const ALL_WOW: u32 = Self::ENUS
        | Self::KOKR
        | Self::FRFR
        | Self::DEDE
        | Self::ZHCN
        | Self::ESES
        | Self::ZHTW
        | Self::ENGB
        | Self::ESMX
        | Self::RURU
        | Self::PTBR
        | Self::ITIT
        | Self::PTPT;

    /// Create new locale flags
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get raw value
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Check if locale flag is set
    pub const fn has(&self, locale: u32) -> bool {
        (self.0 & locale) != 0
    }

    /// Set locale flag
    pub fn set(&mut self, locale: u32) {
        self.0 |= locale;
    }

    /// Clear locale flag
    pub fn clear(&mut self, locale: u32) {
        self.0 &= !locale;
    }

    /// Check if any locale is shared with `other`
    pub const fn matches(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// No locale bit set
    pub const fn is_empty(&self) -> bool {
        self.0 == Self::NONE
    }
}

impl fmt::Display for LocaleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for LocaleFlags {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Locale> for LocaleFlags {
    fn from(locale: Locale) -> Self {
        locale.flags()
    }
}

impl std::ops::BitAnd for LocaleFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl std::ops::BitOr for LocaleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// A locale a caller can select as active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    /// English (United States)
    #[default]
    #[serde(rename = "enUS")]
    EnUs,
    /// Korean
    #[serde(rename = "koKR")]
    KoKr,
    /// French (France)
    #[serde(rename = "frFR")]
    FrFr,
    /// German (Germany)
    #[serde(rename = "deDE")]
    DeDe,
    /// Chinese (China)
    #[serde(rename = "zhCN")]
    ZhCn,
    /// Chinese (Taiwan)
    #[serde(rename = "zhTW")]
    ZhTw,
    /// Spanish (Spain)
    #[serde(rename = "esES")]
    EsEs,
    /// Spanish (Mexico)
    #[serde(rename = "esMX")]
    EsMx,
    /// Russian
    #[serde(rename = "ruRU")]
    RuRu,
    /// Portuguese (Brazil)
    #[serde(rename = "ptBR")]
    PtBr,
    /// Italian (Italy)
    #[serde(rename = "itIT")]
    ItIt,
    /// Every retail locale at once
    #[serde(rename = "all")]
    All,
}

impl Locale {
    /// All selectable locales
    pub const VALUES: [Self; 12] = [
        Self::EnUs,
        Self::KoKr,
        Self::FrFr,
        Self::DeDe,
        Self::ZhCn,
        Self::ZhTw,
        Self::EsEs,
        Self::EsMx,
        Self::RuRu,
        Self::PtBr,
        Self::ItIt,
        Self::All,
    ];

    /// Locale flags matched by this locale
    pub const fn flags(self) -> LocaleFlags {
        LocaleFlags(match self {
            Self::EnUs => LocaleFlags::ENUS,
            Self::KoKr => LocaleFlags::KOKR,
            Self::FrFr => LocaleFlags::FRFR,
            Self::DeDe => LocaleFlags::DEDE,
            Self::ZhCn => LocaleFlags::ZHCN,
            Self::ZhTw => LocaleFlags::ZHTW,
            Self::EsEs => LocaleFlags::ESES,
            Self::EsMx => LocaleFlags::ESMX,
            Self::RuRu => LocaleFlags::RURU,
            Self::PtBr => LocaleFlags::PTBR,
            Self::ItIt => LocaleFlags::ITIT,
            Self::All => LocaleFlags::ALL_WOW,
        })
    }

    /// Locale code as used by the client (`enUS`, `deDE`, ...)
    pub const fn code(self) -> &'static str {
        match self {
            Self::EnUs => "enUS",
            Self::KoKr => "koKR",
            Self::FrFr => "frFR",
            Self::DeDe => "deDE",
            Self::ZhCn => "zhCN",
            Self::ZhTw => "zhTW",
            Self::EsEs => "esES",
            Self::EsMx => "esMX",
            Self::RuRu => "ruRU",
            Self::PtBr => "ptBR",
            Self::ItIt => "itIT",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Unrecognized locale code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown locale: {0}")]
pub struct ParseLocaleError(pub String);

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VALUES
            .into_iter()
            .find(|locale| locale.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLocaleError(s.to_string()))
    }
}
