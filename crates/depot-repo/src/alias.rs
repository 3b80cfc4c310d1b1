//! Deprecated platform-tag aliasing.
//!
//! Consumers built against an older manifest vintage still request
//! deprecated tags. When a channel carries the superseding tag, the
//! deprecated tag is made to mirror it so those consumers transparently
//! receive the newer build.

use crate::artifact::Platform;
use crate::channel::Channel;

/// Default alias table: `(superseding tag, deprecated tag)`.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[("macos", "osx")];

/// Mirrors superseding platform entries onto deprecated tags.
#[derive(Debug)]
pub struct LegacyAliasResolver {
    aliases: Vec<(Platform, Platform)>,
}

impl Default for LegacyAliasResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyAliasResolver {
    /// Creates a resolver over the default alias table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_aliases(DEFAULT_ALIASES)
    }

    /// Creates a resolver over a caller-supplied alias table.
    #[must_use]
    pub fn with_aliases(aliases: &[(&str, &str)]) -> Self {
        Self {
            aliases: aliases
                .iter()
                .map(|(new, old)| (Platform::new(*new), Platform::new(*old)))
                .collect(),
        }
    }

    /// Resolves aliases in place.
    ///
    /// For each `(new, deprecated)` pair: when the channel carries the
    /// new tag, the deprecated tag is synthesized (or overwritten) with
    /// an identical attribute set. One-directional: the deprecated tag
    /// never influences the new one. Idempotent.
    pub fn resolve(&self, channel: &mut Channel) {
        for (new_tag, deprecated_tag) in &self.aliases {
            let Some(source) = channel.find(new_tag) else {
                continue;
            };

            let mut mirror = source.clone();
            mirror.platform = Some(deprecated_tag.clone());
            channel.upsert(mirror);
        }
    }
}
