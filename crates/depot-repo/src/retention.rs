//! Revision retention for tracked versions.

use std::collections::BTreeMap;

use crate::artifact::Artifact;

/// All artifacts observed for one tracked version, bucketed by
/// revision timestamp.
///
/// Keys are fixed-width 10-digit epoch-seconds strings, so the
/// `BTreeMap`'s lexical ordering is also chronological.
pub type VersionGroup = BTreeMap<String, Vec<Artifact>>;

/// Keeps the newest N revision buckets of a [`VersionGroup`] and
/// evicts the rest.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPruner {
    max_revisions: usize,
}

impl RetentionPruner {
    /// Creates a pruner keeping at most `max_revisions` buckets.
    #[must_use]
    pub fn new(max_revisions: usize) -> Self {
        Self { max_revisions }
    }

    /// Prunes a version group in place, returning every evicted
    /// artifact.
    ///
    /// Total and monotonic: each input artifact ends up either in a
    /// kept bucket or in the returned eviction list, exactly once.
    pub fn prune(&self, group: &mut VersionGroup) -> Vec<Artifact> {
        if group.len() <= self.max_revisions {
            return Vec::new();
        }

        let dropped: Vec<String> = group
            .keys()
            .rev()
            .skip(self.max_revisions)
            .cloned()
            .collect();

        let mut evicted = Vec::new();
        for revision in dropped {
            if let Some(artifacts) = group.remove(&revision) {
                evicted.extend(artifacts);
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(path: &str, revision: &str) -> Artifact {
        Artifact {
            path: path.to_string(),
            size: 100,
            platform: Some("src".into()),
            version: "8.4.1".to_string(),
            revision: Some(revision.to_string()),
            checksum: None,
        }
    }

    fn group_of(revisions: &[&str]) -> VersionGroup {
        let mut group = VersionGroup::new();
        for r in revisions {
            group.insert(
                (*r).to_string(),
                vec![artifact(&format!("nightly/build-{r}.tgz"), r)],
            );
        }
        group
    }

    #[test]
    fn keeps_the_newest_buckets() {
        let mut group = group_of(&[
            "1700000001",
            "1700000002",
            "1700000003",
            "1700000004",
            "1700000005",
        ]);

        let evicted = RetentionPruner::new(3).prune(&mut group);

        assert_eq!(group.len(), 3);
        assert!(group.contains_key("1700000003"));
        assert!(group.contains_key("1700000004"));
        assert!(group.contains_key("1700000005"));

        let evicted_revisions: Vec<_> = evicted
            .iter()
            .map(|a| a.revision.clone().expect("revision"))
            .collect();
        assert_eq!(evicted_revisions.len(), 2);
        assert!(evicted_revisions.contains(&"1700000001".to_string()));
        assert!(evicted_revisions.contains(&"1700000002".to_string()));
    }

    #[test]
    fn small_groups_are_untouched() {
        let mut group = group_of(&["1700000001", "1700000002"]);
        let evicted = RetentionPruner::new(3).prune(&mut group);
        assert!(evicted.is_empty());
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn kept_and_evicted_partition_the_input() {
        let mut group = group_of(&["1700000001", "1700000002", "1700000003", "1700000004"]);
        let total: usize = group.values().map(Vec::len).sum();

        let evicted = RetentionPruner::new(2).prune(&mut group);
        let kept: usize = group.values().map(Vec::len).sum();

        assert_eq!(kept + evicted.len(), total);
    }

    #[test]
    fn empty_group_stays_empty() {
        let mut group = VersionGroup::new();
        assert!(RetentionPruner::new(3).prune(&mut group).is_empty());
        assert!(group.is_empty());
    }
}
