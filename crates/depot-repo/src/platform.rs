//! Filename-suffix to platform-tag mapping.
//!
//! The mapping is an ordered first-match table: patterns overlap, so
//! order matters (the 64-bit Windows suffix must be tested before the
//! generic Windows suffix, arch-specific Debian packages before the
//! architecture-independent one, and the new-style macOS package name
//! before the deprecated `osx` fallback).
//!
//! The tag set is an open, versioned table: new tags are added across
//! releases and none are silently removed. Callers needing a different
//! vintage of the table use [`PlatformMapper::with_table`].

use depot_core::{Error, Result};
use regex_lite::Regex;

use crate::artifact::Platform;

/// The current suffix table, evaluated top to bottom.
pub const DEFAULT_TABLE: &[(&str, &str)] = &[
    (r"win64\.exe$", "win64"),
    (r"\.exe$", "win"),
    (r"\.rpm$", "rpm"),
    (r"_amd64\.deb$", "debamd64"),
    (r"_arm\.deb$", "debarm"),
    (r"_i386\.deb$", "debi386"),
    (r"_all\.deb$", "deb"),
    (r"noCPAN\.tgz$", "nocpan"),
    (r"arm-linux\.tgz$", "tararm"),
    (r"\.tgz$", "src"),
    (r"MacOS\.pkg$", "macos"),
    (r"\.pkg$", "osx"),
];

/// Ordered first-match platform mapper.
#[derive(Debug)]
pub struct PlatformMapper {
    table: Vec<(Regex, Platform)>,
}

impl PlatformMapper {
    /// Creates a mapper over the current default table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table patterns do not compile; with the
    /// default table this cannot happen.
    pub fn new() -> Result<Self> {
        Self::with_table(DEFAULT_TABLE)
    }

    /// Creates a mapper over a caller-supplied ordered table.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a pattern does not compile.
    pub fn with_table(table: &[(&str, &str)]) -> Result<Self> {
        let table = table
            .iter()
            .map(|(pattern, tag)| {
                let regex = Regex::new(pattern).map_err(|e| {
                    Error::InvalidInput(format!("invalid platform pattern {pattern}: {e}"))
                })?;
                Ok((regex, Platform::new(*tag)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { table })
    }

    /// Maps a key to a platform tag, or `None` if no pattern matches.
    #[must_use]
    pub fn map(&self, key: &str) -> Option<Platform> {
        self.table
            .iter()
            .find(|(regex, _)| regex.is_match(key))
            .map(|(_, tag)| tag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> PlatformMapper {
        PlatformMapper::new().expect("default table compiles")
    }

    #[test]
    fn win64_is_tested_before_generic_win() {
        let m = mapper();
        assert_eq!(m.map("melodyserver-8.4.1-win64.exe"), Some("win64".into()));
        assert_eq!(m.map("melodyserver-8.4.1.exe"), Some("win".into()));
    }

    #[test]
    fn debian_arch_suffixes_are_distinguished() {
        let m = mapper();
        assert_eq!(m.map("melodyserver_8.4.1_amd64.deb"), Some("debamd64".into()));
        assert_eq!(m.map("melodyserver_8.4.1_arm.deb"), Some("debarm".into()));
        assert_eq!(m.map("melodyserver_8.4.1_i386.deb"), Some("debi386".into()));
        assert_eq!(m.map("melodyserver_8.4.1_all.deb"), Some("deb".into()));
    }

    #[test]
    fn tarball_variants_fall_through_to_src() {
        let m = mapper();
        assert_eq!(m.map("melodyserver-noCPAN.tgz"), Some("nocpan".into()));
        assert_eq!(m.map("melodyserver-arm-linux.tgz"), Some("tararm".into()));
        assert_eq!(m.map("melodyserver-8.4.1.tgz"), Some("src".into()));
    }

    #[test]
    fn macos_package_is_tested_before_deprecated_osx() {
        let m = mapper();
        assert_eq!(m.map("melodyserver-8.4.1-MacOS.pkg"), Some("macos".into()));
        assert_eq!(m.map("melodyserver-8.4.1.pkg"), Some("osx".into()));
    }

    #[test]
    fn unknown_suffix_maps_to_none() {
        let m = mapper();
        assert_eq!(m.map("melodyserver-8.4.1.tgz.md5"), None);
        assert_eq!(m.map("nightly/index.html"), None);
    }

    #[test]
    fn custom_table_extends_the_enumeration() {
        let m = PlatformMapper::with_table(&[(r"\.apk$", "android"), (r"\.exe$", "win")])
            .expect("table compiles");
        assert_eq!(m.map("melodyserver.apk"), Some("android".into()));
        assert_eq!(m.map("melodyserver.tgz"), None);
    }

    #[test]
    fn bad_pattern_is_rejected() {
        assert!(PlatformMapper::with_table(&[(r"(", "broken")]).is_err());
    }
}
