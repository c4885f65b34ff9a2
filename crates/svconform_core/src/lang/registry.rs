//! Shareable metadata for `svconform_core::lang` registries.
//!
//! Every registry (phases, metadata keys) is a `const` table of [`VocabInfo`] entries. The types are
//! `Copy`-friendly so the tables can live in `const` items.

/// Shared metadata shape for “registry-first” vocabulary items.
///
/// - stable identity (`id`)
/// - accepted spellings (`canonical` + `aliases`)
/// - documentation (`description`)
#[derive(Debug, Clone, Copy)]
pub struct VocabInfo<Id> {
    pub id: Id,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl<Id: Copy + PartialEq> VocabInfo<Id> {
    /// Check whether `spelling` is the canonical spelling or one of the aliases.
    pub fn accepts(&self, spelling: &str) -> bool {
        self.canonical == spelling || self.aliases.contains(&spelling)
    }
}

/// Resolve a spelling against a registry table.
pub fn lookup<Id: Copy + PartialEq>(table: &[VocabInfo<Id>], spelling: &str) -> Option<Id> {
    table.iter().find(|info| info.accepts(spelling)).map(|info| info.id)
}

pub(crate) const fn info<Id>(
    id: Id,
    canonical: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
) -> VocabInfo<Id> {
    VocabInfo {
        id,
        canonical,
        aliases,
        description,
    }
}
