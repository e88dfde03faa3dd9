use std::fmt;

use serde::{Deserialize, Serialize};

/// The normalized (lower-cased, trimmed) email address used to key every
/// per-applicant record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate keys for cross-store lookups. Rows written before normalization
/// was enforced still sit under the original casing, so resolution attempts
/// the canonical key first and falls back to the original-cased key.
///
/// Whichever candidate first matches a store must be pinned and reused for
/// every sub-lookup in the same aggregation pass; re-resolving per store
/// risks a split-brain join across inconsistent keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCandidates {
    canonical: CanonicalKey,
    original: String,
}

impl KeyCandidates {
    pub fn resolve(raw: &str) -> Self {
        Self {
            canonical: CanonicalKey::new(raw),
            original: raw.trim().to_string(),
        }
    }

    pub fn canonical(&self) -> &CanonicalKey {
        &self.canonical
    }

    /// Canonical key first, then the original casing when it differs.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let fallback =
            (self.original != self.canonical.as_str()).then_some(self.original.as_str());
        std::iter::once(self.canonical.as_str()).chain(fallback)
    }

    /// Pin the first candidate the probe accepts. `None` means no store knows
    /// this applicant under either casing; aggregation then degrades to an
    /// all-empty view rather than failing the batch.
    pub fn pin<F>(&self, mut probe: F) -> Option<&str>
    where
        F: FnMut(&str) -> bool,
    {
        self.iter().find(|candidate| probe(candidate))
    }
}
