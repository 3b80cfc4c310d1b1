//! Channel assembly from surviving revisions.
//!
//! A [`Channel`] is the externally visible artifact list for one
//! release track: at most one entry per platform tag, ordered by path
//! so the emitted manifests are byte-stable across runs.

use std::collections::HashMap;

use crate::artifact::{Artifact, Platform};
use crate::config::SelectionPolicy;
use crate::retention::VersionGroup;

/// Ordered per-platform artifact list for one release track.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    artifacts: Vec<Artifact>,
}

impl Channel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel's artifacts, sorted by path ascending.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub(crate) fn artifacts_mut(&mut self) -> &mut [Artifact] {
        &mut self.artifacts
    }

    /// Returns the entry carrying the given platform tag, if any.
    #[must_use]
    pub fn find(&self, platform: &Platform) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|a| a.platform.as_ref() == Some(platform))
    }

    /// Inserts an artifact, replacing any existing entry with the same
    /// platform tag. Artifacts without a platform are irrelevant to
    /// channels and are dropped.
    pub fn upsert(&mut self, artifact: Artifact) {
        let Some(platform) = artifact.platform.clone() else {
            return;
        };

        if let Some(existing) = self
            .artifacts
            .iter_mut()
            .find(|a| a.platform.as_ref() == Some(&platform))
        {
            *existing = artifact;
        } else {
            self.artifacts.push(artifact);
        }
        self.artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Returns true when the channel has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }
}

/// Builds the current channel for a tracked version from its surviving
/// revision buckets.
#[derive(Debug)]
pub struct ChannelSelector {
    policy: SelectionPolicy,
    checksum_suffix: String,
}

impl ChannelSelector {
    /// Creates a selector with the given policy and sidecar suffix.
    #[must_use]
    pub fn new(policy: SelectionPolicy, checksum_suffix: impl Into<String>) -> Self {
        Self {
            policy,
            checksum_suffix: checksum_suffix.into(),
        }
    }

    /// Produces the channel for one version group.
    #[must_use]
    pub fn select(&self, group: &VersionGroup) -> Channel {
        match self.policy {
            SelectionPolicy::LatestRevision => self.select_latest(group),
            SelectionPolicy::ProgressiveMerge => self.select_merged(group),
        }
    }

    /// The single newest surviving revision becomes the channel
    /// verbatim, minus checksum sidecars.
    fn select_latest(&self, group: &VersionGroup) -> Channel {
        let mut channel = Channel::new();
        let Some(newest) = group.keys().next_back().cloned() else {
            return channel;
        };

        let mut bucket: Vec<Artifact> = group[&newest]
            .iter()
            .filter(|a| !self.is_sidecar(&a.path))
            .cloned()
            .collect();
        bucket.sort_by(|a, b| a.path.cmp(&b.path));

        for artifact in bucket {
            channel.upsert(artifact);
        }
        channel
    }

    /// Folds surviving revisions oldest-first into a map keyed by
    /// platform identity (the path with its own revision substring
    /// wildcarded). Later revisions that publish the same identity
    /// overwrite the earlier entry, so the final state reflects the
    /// newest revision that actually published each platform even when
    /// platforms were introduced in different revisions.
    fn select_merged(&self, group: &VersionGroup) -> Channel {
        let mut current: HashMap<String, Artifact> = HashMap::new();

        for (revision, artifacts) in group {
            let mut bucket: Vec<&Artifact> = artifacts
                .iter()
                .filter(|a| !self.is_sidecar(&a.path))
                .collect();
            bucket.sort_by(|a, b| a.path.cmp(&b.path));

            for artifact in bucket {
                let identity = artifact.path.replace(revision.as_str(), "*");
                current.insert(identity, artifact.clone());
            }
        }

        let mut merged: Vec<Artifact> = current.into_values().collect();
        merged.sort_by(|a, b| a.path.cmp(&b.path));

        let mut channel = Channel::new();
        for artifact in merged {
            channel.upsert(artifact);
        }
        channel
    }

    fn is_sidecar(&self, path: &str) -> bool {
        path.ends_with(&self.checksum_suffix)
    }
}
