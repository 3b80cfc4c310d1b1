//! Per-run repository configuration.
//!
//! All version strings, bucket names, and policy knobs are carried in
//! an explicit [`RepoConfig`] constructed once per run and threaded
//! through every component. Core logic never reads ambient process
//! state.

use depot_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of nightly revisions retained per tracked version.
pub const DEFAULT_MAX_REVISIONS: usize = 3;

/// Default object-key prefix for nightly builds.
pub const DEFAULT_NIGHTLY_PREFIX: &str = "nightly/";

/// Default checksum sidecar suffix.
pub const DEFAULT_CHECKSUM_SUFFIX: &str = ".md5";

/// Channel selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Take the artifact list of the single newest surviving revision.
    LatestRevision,
    /// Merge surviving revisions oldest-first so each platform's entry
    /// reflects the newest revision that actually published it.
    ProgressiveMerge,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::ProgressiveMerge
    }
}

/// What to do when a listing, delete, or sidecar fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnTransportError {
    /// Log the failure and continue with degraded data (empty listing,
    /// missing checksum, unclean bucket).
    Degrade,
    /// Propagate the failure and abort the run.
    Abort,
}

impl Default for OnTransportError {
    fn default() -> Self {
        Self::Degrade
    }
}

/// Configuration for one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Bucket name, used to build artifact download URLs.
    pub bucket: String,

    /// Host prepended to object keys in manifest URLs.
    pub download_host: String,

    /// Tracked stable version string (e.g. `8.4.1`).
    pub stable_version: String,

    /// Tracked development version string.
    pub dev_version: String,

    /// Object-key prefix under which the pinned production release
    /// lives. When unset the `latest` channel is skipped.
    #[serde(default)]
    pub release_prefix: Option<String>,

    /// Fixed revision stamped onto pinned release artifacts (their
    /// keys carry no timestamp). When unset the `latest` channel is
    /// skipped.
    #[serde(default)]
    pub release_revision: Option<String>,

    /// Object-key prefix for nightly builds.
    #[serde(default = "default_nightly_prefix")]
    pub nightly_prefix: String,

    /// Ordered product-name prefixes the classifier accepts.
    pub product_patterns: Vec<String>,

    /// Number of nightly revisions retained per tracked version.
    #[serde(default = "default_max_revisions")]
    pub max_revisions: usize,

    /// Checksum sidecar suffix appended to artifact keys.
    #[serde(default = "default_checksum_suffix")]
    pub checksum_suffix: String,

    /// Channel selection policy.
    #[serde(default)]
    pub selection_policy: SelectionPolicy,

    /// Fail-open vs fail-closed behavior on transport errors.
    #[serde(default)]
    pub on_transport_error: OnTransportError,
}

fn default_nightly_prefix() -> String {
    DEFAULT_NIGHTLY_PREFIX.to_string()
}

fn default_max_revisions() -> usize {
    DEFAULT_MAX_REVISIONS
}

fn default_checksum_suffix() -> String {
    DEFAULT_CHECKSUM_SUFFIX.to_string()
}

impl RepoConfig {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `DEPOT_BUCKET` (required)
    /// - `DEPOT_DOWNLOAD_HOST` (defaults to the bucket name)
    /// - `DEPOT_STABLE_VERSION` (required)
    /// - `DEPOT_DEV_VERSION` (required)
    /// - `DEPOT_RELEASE_PREFIX`
    /// - `DEPOT_RELEASE_REVISION`
    /// - `DEPOT_NIGHTLY_PREFIX` (default: `nightly/`)
    /// - `DEPOT_PRODUCT_PATTERNS` (comma-separated, required)
    /// - `DEPOT_MAX_REVISIONS` (default: 3)
    /// - `DEPOT_CHECKSUM_SUFFIX` (default: `.md5`)
    /// - `DEPOT_SELECTION_POLICY` (`latest_revision` | `progressive_merge`)
    /// - `DEPOT_ON_TRANSPORT_ERROR` (`degrade` | `abort`)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a present
    /// variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let bucket = require_env("DEPOT_BUCKET")?;
        let download_host = env_string("DEPOT_DOWNLOAD_HOST").unwrap_or_else(|| bucket.clone());

        let config = Self {
            bucket,
            download_host,
            stable_version: require_env("DEPOT_STABLE_VERSION")?,
            dev_version: require_env("DEPOT_DEV_VERSION")?,
            release_prefix: env_string("DEPOT_RELEASE_PREFIX"),
            release_revision: env_string("DEPOT_RELEASE_REVISION"),
            nightly_prefix: env_string("DEPOT_NIGHTLY_PREFIX")
                .unwrap_or_else(default_nightly_prefix),
            product_patterns: parse_list(&require_env("DEPOT_PRODUCT_PATTERNS")?),
            max_revisions: env_usize("DEPOT_MAX_REVISIONS")?.unwrap_or(DEFAULT_MAX_REVISIONS),
            checksum_suffix: env_string("DEPOT_CHECKSUM_SUFFIX")
                .unwrap_or_else(default_checksum_suffix),
            selection_policy: match env_string("DEPOT_SELECTION_POLICY") {
                Some(v) => parse_selection_policy("DEPOT_SELECTION_POLICY", &v)?,
                None => SelectionPolicy::default(),
            },
            on_transport_error: match env_string("DEPOT_ON_TRANSPORT_ERROR") {
                Some(v) => parse_on_transport_error("DEPOT_ON_TRANSPORT_ERROR", &v)?,
                None => OnTransportError::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting is out of range or incoherent.
    pub fn validate(&self) -> Result<()> {
        if self.max_revisions == 0 {
            return Err(Error::InvalidInput(
                "max_revisions must be at least 1".to_string(),
            ));
        }
        if self.product_patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::InvalidInput(
                "at least one product pattern is required".to_string(),
            ));
        }
        if self.release_prefix.is_some() != self.release_revision.is_some() {
            return Err(Error::InvalidInput(
                "release_prefix and release_revision must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true when a pinned production release is configured.
    #[must_use]
    pub fn has_release(&self) -> bool {
        self.release_prefix.is_some() && self.release_revision.is_some()
    }
}

fn parse_selection_policy(name: &str, value: &str) -> Result<SelectionPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "latest_revision" => Ok(SelectionPolicy::LatestRevision),
        "progressive_merge" => Ok(SelectionPolicy::ProgressiveMerge),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be one of: latest_revision, progressive_merge (got {value})"
        ))),
    }
}

fn parse_on_transport_error(name: &str, value: &str) -> Result<OnTransportError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "degrade" => Ok(OnTransportError::Degrade),
        "abort" => Ok(OnTransportError::Abort),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be one of: degrade, abort (got {value})"
        ))),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn require_env(name: &str) -> Result<String> {
    env_string(name).ok_or_else(|| Error::InvalidInput(format!("{name} is required")))
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<usize>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a usize: {e}")))
}
