//! Object-key classification.
//!
//! Parses raw object-store keys into version/revision tuples. Two
//! matchers are compiled from the configured product-name prefixes:
//! the nightly matcher requires a 10-digit revision timestamp later in
//! the key, the release matcher does not (the pinned production
//! release has a single fixed revision supplied by configuration).

use depot_core::{Error, Result};
use regex_lite::Regex;

use crate::config::RepoConfig;

/// Outcome of classifying a single object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A nightly build key with an embedded revision timestamp.
    Nightly {
        /// Semantic version parsed from the key.
        version: String,
        /// 10-digit epoch-seconds revision parsed from the key.
        revision: String,
    },
    /// A known index-page key; neither tracked nor deleted.
    Ignorable,
    /// Matches no known pattern; a deletion candidate.
    Unclassified,
}

/// Compiled key matchers for one run.
#[derive(Debug)]
pub struct KeyClassifier {
    nightly: Regex,
    release: Regex,
    index_page: Regex,
}

impl KeyClassifier {
    /// Compiles the matchers from the configured product patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the patterns do not compile.
    pub fn new(config: &RepoConfig) -> Result<Self> {
        let products = config
            .product_patterns
            .iter()
            .map(|p| escape(p))
            .collect::<Vec<_>>()
            .join("|");

        // Product name, any separator character, then a 2-3 component
        // semantic version. Nightly keys additionally carry a 10-digit
        // timestamp later in the key; greedy `.*` picks the last one.
        let release = compile(&format!(r"(?i)(?:{products}).(\d+\.\d+(?:\.\d+)?)"))?;
        let nightly = compile(&format!(
            r"(?i)(?:{products}).(\d+\.\d+(?:\.\d+)?).*(\d{{10}})"
        ))?;
        let index_page = compile(r"index\.(?:php|html)$")?;

        Ok(Self {
            nightly,
            release,
            index_page,
        })
    }

    /// Classifies a nightly-listing key.
    #[must_use]
    pub fn classify(&self, key: &str) -> Classification {
        if let Some(caps) = self.nightly.captures(key) {
            if let (Some(version), Some(revision)) = (caps.get(1), caps.get(2)) {
                return Classification::Nightly {
                    version: version.as_str().to_string(),
                    revision: revision.as_str().to_string(),
                };
            }
        }

        if self.index_page.is_match(key) {
            return Classification::Ignorable;
        }

        Classification::Unclassified
    }

    /// Matches a pinned-release key, returning the embedded version.
    ///
    /// Release keys carry no trailing timestamp; the revision comes
    /// from configuration instead.
    #[must_use]
    pub fn classify_release(&self, key: &str) -> Option<String> {
        self.release
            .captures(key)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::InvalidInput(format!("invalid key pattern {pattern}: {e}")))
}

/// Escapes regex metacharacters in a product name.
fn escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if c.is_ascii_alphanumeric() {
            escaped.push(c);
        } else {
            escaped.push('\\');
            escaped.push(c);
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OnTransportError, SelectionPolicy};

    fn classifier() -> KeyClassifier {
        let config = RepoConfig {
            bucket: "downloads.example.com".to_string(),
            download_host: "downloads.example.com".to_string(),
            stable_version: "8.4.1".to_string(),
            dev_version: "8.4.1".to_string(),
            release_prefix: None,
            release_revision: None,
            nightly_prefix: "nightly/".to_string(),
            product_patterns: vec!["melodyserver".to_string(), "melody-server".to_string()],
            max_revisions: 3,
            checksum_suffix: ".md5".to_string(),
            selection_policy: SelectionPolicy::default(),
            on_transport_error: OnTransportError::default(),
        };
        KeyClassifier::new(&config).expect("patterns compile")
    }

    #[test]
    fn nightly_key_yields_version_and_revision() {
        let c = classifier();
        assert_eq!(
            c.classify("nightly/melodyserver-8.4.1-1700000001-amd64.deb"),
            Classification::Nightly {
                version: "8.4.1".to_string(),
                revision: "1700000001".to_string(),
            }
        );
    }

    #[test]
    fn classification_is_case_insensitive_on_product() {
        let c = classifier();
        assert!(matches!(
            c.classify("nightly/MelodyServer-8.4.1-1700000001.tgz"),
            Classification::Nightly { .. }
        ));
    }

    #[test]
    fn two_component_versions_are_accepted() {
        let c = classifier();
        assert_eq!(
            c.classify("nightly/melodyserver-9.0-1700000009.tgz"),
            Classification::Nightly {
                version: "9.0".to_string(),
                revision: "1700000009".to_string(),
            }
        );
    }

    #[test]
    fn greedy_match_picks_the_last_timestamp() {
        let c = classifier();
        assert_eq!(
            c.classify("nightly/1699999999/melodyserver-8.4.1-1700000001.tgz"),
            Classification::Nightly {
                version: "8.4.1".to_string(),
                revision: "1700000001".to_string(),
            }
        );
    }

    #[test]
    fn index_pages_are_ignorable() {
        let c = classifier();
        assert_eq!(c.classify("nightly/index.html"), Classification::Ignorable);
        assert_eq!(c.classify("nightly/index.php"), Classification::Ignorable);
    }

    #[test]
    fn unknown_keys_are_unclassified() {
        let c = classifier();
        assert_eq!(
            c.classify("nightly/otherproduct-1.0.0-1700000001.tgz"),
            Classification::Unclassified
        );
        assert_eq!(
            c.classify("nightly/melodyserver-8.4.1.tgz"),
            Classification::Unclassified
        );
    }

    #[test]
    fn release_keys_need_no_timestamp() {
        let c = classifier();
        assert_eq!(
            c.classify_release("MelodyServer_v8.4.0/melodyserver-8.4.0-amd64.deb"),
            Some("8.4.0".to_string())
        );
        assert_eq!(c.classify_release("MelodyServer_v8.4.0/README"), None);
    }
}
