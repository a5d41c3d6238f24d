//! Variant selection among the entries of one FileDataID

use crate::{flags::LocaleFlags, index::RootEntry};
use serde::{Deserialize, Serialize};

/// Active locale and alternate-variant preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvePolicy {
    /// Locales accepted by the caller
    pub locale: LocaleFlags,
    /// Prefer `ALTERNATE` variants over the default build
    pub override_archive: bool,
}

impl ResolvePolicy {
    /// Create a policy
    pub const fn new(locale: LocaleFlags, override_archive: bool) -> Self {
        Self {
            locale,
            override_archive,
        }
    }
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self::new(LocaleFlags::new(LocaleFlags::ENUS), false)
    }
}

/// Picks the entries that apply under a [`ResolvePolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantResolver {
    policy: ResolvePolicy,
}

impl VariantResolver {
    /// Create a resolver for `policy`
    pub const fn new(policy: ResolvePolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect
    pub const fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// Entries matching the locale, narrowed by the alternate preference
    ///
    /// When more than one entry matches the locale, only those whose
    /// alternate flag agrees with `override_archive` are kept, unless that
    /// leaves nothing. Manifest order is preserved.
    pub fn resolve(&self, entries: &[RootEntry]) -> Vec<RootEntry> {
        let matched: Vec<RootEntry> = entries
            .iter()
            .filter(|entry| entry.matches_locale(self.policy.locale))
            .copied()
            .collect();

        if matched.len() <= 1 {
            return matched;
        }

        let preferred: Vec<RootEntry> = matched
            .iter()
            .filter(|entry| entry.is_alternate() == self.policy.override_archive)
            .copied()
            .collect();

        if preferred.is_empty() {
            matched
        } else {
            preferred
        }
    }

    /// First entry of [`Self::resolve`]
    pub fn resolve_one(&self, entries: &[RootEntry]) -> Option<RootEntry> {
        self.resolve(entries).into_iter().next()
    }
}
