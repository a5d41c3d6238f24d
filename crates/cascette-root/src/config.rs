//! Configuration for root manifest handling

use crate::{
    error::Result, flags::Locale, index::ConflictPolicy, resolver::ResolvePolicy,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for parsing a manifest and building its catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Active locale
    pub locale: Locale,

    /// Prefer alternate variants when several match the locale
    pub override_archive: bool,

    /// Handling of a FileDataID seen with two different hashes
    pub conflict_policy: ConflictPolicy,

    /// Fail when header counts disagree with the manifest body
    pub strict_counts: bool,
}

impl RootConfig {
    /// Create a configuration for `locale`
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            ..Default::default()
        }
    }

    /// Set the active locale
    #[must_use]
    pub const fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Prefer or avoid alternate variants
    #[must_use]
    pub const fn with_override_archive(mut self, enable: bool) -> Self {
        self.override_archive = enable;
        self
    }

    /// Set the conflict policy
    #[must_use]
    pub const fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Enable or disable strict header count checking
    #[must_use]
    pub const fn with_strict_counts(mut self, enable: bool) -> Self {
        self.strict_counts = enable;
        self
    }

    /// Resolution policy derived from the locale and override setting
    pub const fn resolve_policy(&self) -> ResolvePolicy {
        ResolvePolicy::new(self.locale.flags(), self.override_archive)
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
