//! Manifest serialization.
//!
//! Two formats are emitted per run:
//!
//! - an intermediate tagged-element document per channel (one
//!   self-closing element per artifact, named by platform tag), the
//!   format installers have consumed for years;
//! - a consolidated JSON index assembling every channel under its
//!   label, written once per run.
//!
//! Writing is deterministic: entries arrive path-sorted from the
//! channel and attributes are rendered in a fixed order, so a run with
//! unchanged inputs produces byte-identical manifests.

use std::collections::BTreeMap;

use depot_core::{Error, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::artifact::{pretty_size, Artifact};
use crate::channel::Channel;

/// One rendered manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Platform tag (the element name in the tagged format).
    pub platform: String,
    /// Download URL.
    pub url: String,
    /// Semantic version string.
    pub version: String,
    /// Revision timestamp string.
    pub revision: String,
    /// Human-readable size magnitude.
    pub size: String,
    /// Optional hex content digest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl ManifestEntry {
    /// Renders an artifact as a manifest entry.
    ///
    /// Returns `None` for artifacts without a platform tag; they never
    /// appear in manifests.
    #[must_use]
    pub fn from_artifact(artifact: &Artifact, download_host: &str) -> Option<Self> {
        let platform = artifact.platform.as_ref()?.to_string();
        Some(Self {
            platform,
            url: format!("https://{download_host}/{}", artifact.path),
            version: artifact.version.clone(),
            revision: artifact.revision.clone().unwrap_or_default(),
            size: pretty_size(artifact.size),
            checksum: artifact.checksum.clone(),
        })
    }
}

/// Renders a channel as a tagged-element document.
#[must_use]
pub fn write_channel(channel: &Channel, download_host: &str) -> String {
    let mut doc = String::from("<servers>");
    for artifact in channel.artifacts() {
        let Some(entry) = ManifestEntry::from_artifact(artifact, download_host) else {
            continue;
        };
        doc.push_str(&format!(
            "<{} url=\"{}\" version=\"{}\" revision=\"{}\" size=\"{}\"",
            entry.platform,
            escape(&entry.url),
            escape(&entry.version),
            escape(&entry.revision),
            escape(&entry.size),
        ));
        if let Some(checksum) = &entry.checksum {
            doc.push_str(&format!(" checksum=\"{}\"", escape(checksum)));
        }
        doc.push_str("/>");
    }
    doc.push_str("</servers>");
    doc
}

/// Parses a tagged-element document back into manifest entries.
///
/// # Errors
///
/// Returns `Error::Serialization` if the document is malformed or an
/// entry is missing a required attribute.
pub fn parse_channel(doc: &str) -> Result<Vec<ManifestEntry>> {
    let trimmed = doc.trim();
    if !trimmed.starts_with("<servers>") || !trimmed.ends_with("</servers>") {
        return Err(Error::Serialization {
            message: "document is missing the <servers> root".to_string(),
        });
    }
    let body = &trimmed["<servers>".len()..trimmed.len() - "</servers>".len()];

    // Compile failures are unreachable for these literals, but the
    // error path keeps the signature honest.
    let element = regex(r#"<([A-Za-z_][A-Za-z0-9_-]*)((?:\s+[A-Za-z_][A-Za-z0-9_-]*="[^"]*")*)\s*/>"#)?;
    let attribute = regex(r#"([A-Za-z_][A-Za-z0-9_-]*)="([^"]*)""#)?;

    let mut entries = Vec::new();
    for caps in element.captures_iter(body) {
        let platform = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| malformed("element without a name"))?;
        let raw_attrs = caps.get(2).map_or("", |m| m.as_str());

        let mut attrs = BTreeMap::new();
        for attr in attribute.captures_iter(raw_attrs) {
            let (Some(name), Some(value)) = (attr.get(1), attr.get(2)) else {
                continue;
            };
            attrs.insert(name.as_str().to_string(), unescape(value.as_str()));
        }

        entries.push(ManifestEntry {
            url: required(&platform, &mut attrs, "url")?,
            version: required(&platform, &mut attrs, "version")?,
            revision: required(&platform, &mut attrs, "revision")?,
            size: required(&platform, &mut attrs, "size")?,
            checksum: attrs.remove("checksum"),
            platform,
        });
    }

    Ok(entries)
}

/// Consolidated repository index: channel label to entry list.
///
/// Labels are `"latest"` plus the tracked stable and development
/// version strings. Serialized as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoIndex {
    channels: BTreeMap<String, Vec<ManifestEntry>>,
}

impl RepoIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) a channel under the given label.
    pub fn insert(&mut self, label: impl Into<String>, entries: Vec<ManifestEntry>) {
        self.channels.insert(label.into(), entries);
    }

    /// Returns the entries under a label, if present.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&[ManifestEntry]> {
        self.channels.get(label).map(Vec::as_slice)
    }

    /// Serializes the index as one JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization {
            message: format!("failed to encode repository index: {e}"),
        })
    }

    /// Parses an index from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if decoding fails.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization {
            message: format!("failed to parse repository index: {e}"),
        })
    }
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Internal {
        message: format!("manifest pattern failed to compile: {e}"),
    })
}

fn malformed(detail: &str) -> Error {
    Error::Serialization {
        message: format!("malformed manifest: {detail}"),
    }
}

fn required(
    platform: &str,
    attrs: &mut BTreeMap<String, String>,
    name: &str,
) -> Result<String> {
    attrs
        .remove(name)
        .ok_or_else(|| malformed(&format!("<{platform}> is missing the {name} attribute")))
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;

    fn artifact(path: &str, platform: &str, checksum: Option<&str>) -> Artifact {
        Artifact {
            path: path.to_string(),
            size: 80 * 1024 * 1024,
            platform: Some(platform.into()),
            version: "8.4.1".to_string(),
            revision: Some("1700000001".to_string()),
            checksum: checksum.map(str::to_string),
        }
    }

    fn sample_channel() -> Channel {
        let mut channel = Channel::new();
        channel.upsert(artifact(
            "nightly/m-8.4.1-1700000001.exe",
            "win",
            Some("0123456789abcdef0123456789abcdef"),
        ));
        channel.upsert(artifact("nightly/m-8.4.1-1700000001_all.deb", "deb", None));
        channel
    }

    #[test]
    fn written_document_has_servers_root_and_sorted_entries() {
        let doc = write_channel(&sample_channel(), "downloads.example.com");

        assert!(doc.starts_with("<servers>"));
        assert!(doc.ends_with("</servers>"));
        // Path order: .exe sorts before _all.deb.
        let exe = doc.find("m-8.4.1-1700000001.exe").expect("exe entry");
        let deb = doc.find("m-8.4.1-1700000001_all.deb").expect("deb entry");
        assert!(exe < deb);
        assert!(doc.contains("url=\"https://downloads.example.com/nightly/m-8.4.1-1700000001.exe\""));
        assert!(doc.contains("size=\"80 MB\""));
    }

    #[test]
    fn checksum_attribute_is_omitted_when_absent() {
        let doc = write_channel(&sample_channel(), "downloads.example.com");
        assert_eq!(doc.matches("checksum=").count(), 1);
    }

    #[test]
    fn roundtrip_preserves_the_entry_set() {
        let channel = sample_channel();
        let doc = write_channel(&channel, "downloads.example.com");
        let parsed = parse_channel(&doc).expect("parse");

        let expected: Vec<ManifestEntry> = channel
            .artifacts()
            .iter()
            .filter_map(|a| ManifestEntry::from_artifact(a, "downloads.example.com"))
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut channel = Channel::new();
        channel.upsert(artifact("nightly/m \"8.4.1\" <all>&more.tgz", "src", None));

        let doc = write_channel(&channel, "downloads.example.com");
        assert!(doc.contains("&quot;"));
        assert!(doc.contains("&lt;all&gt;"));
        assert!(doc.contains("&amp;more"));

        let parsed = parse_channel(&doc).expect("parse");
        assert!(parsed[0].url.contains("m \"8.4.1\" <all>&more.tgz"));
    }

    #[test]
    fn empty_channel_writes_an_empty_root() {
        let doc = write_channel(&Channel::new(), "downloads.example.com");
        assert_eq!(doc, "<servers></servers>");
        assert!(parse_channel(&doc).expect("parse").is_empty());
    }

    #[test]
    fn missing_root_is_rejected() {
        let err = parse_channel("<win url=\"u\"/>").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn missing_required_attribute_is_rejected() {
        let err = parse_channel("<servers><win url=\"u\" version=\"1\"/></servers>").unwrap_err();
        let Error::Serialization { message } = err else {
            panic!("unexpected error");
        };
        assert!(message.contains("revision"));
    }

    #[test]
    fn index_serializes_all_channel_labels() {
        let channel = sample_channel();
        let entries: Vec<ManifestEntry> = channel
            .artifacts()
            .iter()
            .filter_map(|a| ManifestEntry::from_artifact(a, "downloads.example.com"))
            .collect();

        let mut index = RepoIndex::new();
        index.insert("latest", entries.clone());
        index.insert("8.4.1", entries);
        index.insert("9.0.0", Vec::new());

        let json = index.to_json().expect("encode");
        let parsed = RepoIndex::from_json(&json).expect("decode");
        assert_eq!(parsed, index);
        assert_eq!(parsed.get("9.0.0"), Some(&[][..]));
    }
}
