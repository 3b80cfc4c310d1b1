//! The reconciliation pipeline.
//!
//! One run is a single linear pipeline over one listing snapshot:
//! classify and bucket the nightly listing, prune each tracked
//! version's revisions, select the per-channel artifact sets, collect
//! the pinned production release, post-process with alias resolution
//! and checksum enrichment, then purge the obsolete set. There is no
//! concurrency and no persisted state beyond the manifests the caller
//! writes from the outcome.

use std::collections::BTreeMap;

use depot_core::{ObjectMeta, Result, StorageBackend};

use crate::alias::LegacyAliasResolver;
use crate::artifact::Artifact;
use crate::channel::{Channel, ChannelSelector};
use crate::checksum::ChecksumEnricher;
use crate::classifier::{Classification, KeyClassifier};
use crate::config::{OnTransportError, RepoConfig};
use crate::platform::PlatformMapper;
use crate::retention::{RetentionPruner, VersionGroup};

/// Result of one reconciliation run.
///
/// Non-fatal failures (degrade policy) are accumulated in `errors`
/// without aborting the run; the channels then reflect whatever data
/// survived. Callers deciding whether to publish should check
/// [`ReconcileOutcome::has_errors`].
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Current stable channel.
    pub stable: Channel,
    /// Current development channel.
    pub dev: Channel,
    /// Pinned production release channel; empty when unconfigured.
    pub latest: Channel,
    /// Number of obsolete keys purged from the bucket.
    pub deleted: u64,
    /// Number of ignorable keys (index pages) left in place.
    pub ignored: u64,
    /// Non-fatal failure messages recorded in degrade mode.
    pub errors: Vec<String>,
}

impl ReconcileOutcome {
    /// Returns true if any non-fatal errors were recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Reconciles the release bucket against the configured versions.
pub struct Reconciler<B: StorageBackend> {
    backend: B,
    config: RepoConfig,
    classifier: KeyClassifier,
    mapper: PlatformMapper,
    aliases: LegacyAliasResolver,
}

impl<B: StorageBackend> Reconciler<B> {
    /// Creates a reconciler for one run.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or its key
    /// patterns do not compile.
    pub fn new(backend: B, config: RepoConfig) -> Result<Self> {
        config.validate()?;
        let classifier = KeyClassifier::new(&config)?;
        let mapper = PlatformMapper::new()?;

        Ok(Self {
            backend,
            config,
            classifier,
            mapper,
            aliases: LegacyAliasResolver::new(),
        })
    }

    /// Runs one reconciliation pass.
    ///
    /// # Errors
    ///
    /// With `on_transport_error = abort`, the first transport failure
    /// is propagated. In degrade mode transport failures are logged,
    /// recorded on the outcome, and treated as empty results.
    pub async fn run(&self) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();

        tracing::info!(
            bucket = %self.config.bucket,
            stable = %self.config.stable_version,
            dev = %self.config.dev_version,
            max_revisions = self.config.max_revisions,
            "starting reconciliation"
        );

        // Phase 1: classify the nightly listing into version groups
        // and the obsolete set.
        let listing = self
            .list_or_degrade(&self.config.nightly_prefix, &mut outcome.errors)
            .await?;

        let mut groups: BTreeMap<String, VersionGroup> = BTreeMap::new();
        let mut obsolete: Vec<String> = Vec::new();

        for meta in listing {
            match self.classifier.classify(&meta.path) {
                Classification::Nightly { version, revision } if self.is_tracked(&version) => {
                    let artifact = self.nightly_artifact(&meta, version.clone(), revision.clone());
                    groups
                        .entry(version)
                        .or_default()
                        .entry(revision)
                        .or_default()
                        .push(artifact);
                }
                Classification::Nightly { .. } | Classification::Unclassified => {
                    obsolete.push(meta.path);
                }
                Classification::Ignorable => outcome.ignored += 1,
            }
        }

        // Phase 2: prune each tracked version's revision buckets.
        let pruner = RetentionPruner::new(self.config.max_revisions);
        for group in groups.values_mut() {
            let evicted = pruner.prune(group);
            obsolete.extend(evicted.into_iter().map(|a| a.path));
        }

        // Phase 3: select the nightly channels.
        let selector = ChannelSelector::new(
            self.config.selection_policy,
            self.config.checksum_suffix.clone(),
        );
        outcome.stable = groups
            .get(&self.config.stable_version)
            .map(|g| selector.select(g))
            .unwrap_or_default();
        outcome.dev = groups
            .get(&self.config.dev_version)
            .map(|g| selector.select(g))
            .unwrap_or_default();

        // Phase 4: collect the pinned production release.
        outcome.latest = self.collect_release(&mut outcome.errors).await?;

        // Phase 5: alias resolution, then checksum enrichment, probing
        // sidecars one artifact at a time in path order.
        let enricher = ChecksumEnricher::new(
            &self.backend,
            &self.config.checksum_suffix,
            self.config.on_transport_error,
        );
        for channel in [&mut outcome.stable, &mut outcome.dev, &mut outcome.latest] {
            self.aliases.resolve(channel);
            let errors = enricher.enrich(channel).await?;
            outcome.errors.extend(errors);
        }

        // Phase 6: purge the obsolete set. It is never read back.
        outcome.deleted = self.purge(obsolete, &mut outcome.errors).await?;

        tracing::info!(
            stable_entries = outcome.stable.len(),
            dev_entries = outcome.dev.len(),
            latest_entries = outcome.latest.len(),
            deleted = outcome.deleted,
            ignored = outcome.ignored,
            errors = outcome.errors.len(),
            "reconciliation completed"
        );

        Ok(outcome)
    }

    fn is_tracked(&self, version: &str) -> bool {
        version == self.config.stable_version || version == self.config.dev_version
    }

    fn nightly_artifact(&self, meta: &ObjectMeta, version: String, revision: String) -> Artifact {
        Artifact {
            path: meta.path.clone(),
            size: meta.size,
            platform: self.mapper.map(&meta.path),
            version,
            revision: Some(revision),
            checksum: None,
        }
    }

    /// Lists the pinned release prefix and stamps the configured
    /// revision onto each matching artifact. Returns an empty channel
    /// when no release is configured.
    async fn collect_release(&self, errors: &mut Vec<String>) -> Result<Channel> {
        let mut channel = Channel::new();
        let (Some(prefix), Some(revision)) = (
            self.config.release_prefix.as_deref(),
            self.config.release_revision.as_deref(),
        ) else {
            return Ok(channel);
        };

        let mut listing = self.list_or_degrade(prefix, errors).await?;
        listing.sort_by(|a, b| a.path.cmp(&b.path));

        for meta in listing {
            if meta.path.ends_with(&self.config.checksum_suffix) {
                continue;
            }
            let Some(version) = self.classifier.classify_release(&meta.path) else {
                continue;
            };
            channel.upsert(Artifact {
                path: meta.path.clone(),
                size: meta.size,
                platform: self.mapper.map(&meta.path),
                version,
                revision: Some(revision.to_string()),
                checksum: None,
            });
        }

        Ok(channel)
    }

    async fn list_or_degrade(
        &self,
        prefix: &str,
        errors: &mut Vec<String>,
    ) -> Result<Vec<ObjectMeta>> {
        match self.backend.list(prefix).await {
            Ok(listing) => Ok(listing),
            Err(e) => match self.config.on_transport_error {
                OnTransportError::Abort => Err(e),
                OnTransportError::Degrade => {
                    tracing::warn!(prefix, error = %e, "listing failed, continuing with empty result");
                    errors.push(format!("list {prefix}: {e}"));
                    Ok(Vec::new())
                }
            },
        }
    }

    async fn purge(&self, obsolete: Vec<String>, errors: &mut Vec<String>) -> Result<u64> {
        if obsolete.is_empty() {
            return Ok(0);
        }

        let count = obsolete.len() as u64;
        match self.backend.delete_batch(&obsolete).await {
            Ok(()) => {
                tracing::info!(count, "purged obsolete artifacts");
                Ok(count)
            }
            Err(e) => match self.config.on_transport_error {
                OnTransportError::Abort => Err(e),
                OnTransportError::Degrade => {
                    tracing::warn!(count, error = %e, "obsolete purge failed");
                    errors.push(format!("delete obsolete: {e}"));
                    Ok(0)
                }
            },
        }
    }
}
