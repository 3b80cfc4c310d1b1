//! # depot-repo
//!
//! Release-repository reconciliation for the depot distribution bucket.
//!
//! One reconciliation run turns a raw object-store listing into the
//! published state of the repository:
//!
//! - **Classification**: parse object keys into version/revision tuples
//! - **Retention**: keep the newest N nightly revisions per tracked
//!   version, evict the rest
//! - **Channel Selection**: pick the per-platform current artifact for
//!   the stable, development, and pinned-release channels
//! - **Post-processing**: mirror deprecated platform tags and attach
//!   checksum sidecar digests
//! - **Manifests**: render deterministic tagged-element documents and a
//!   consolidated JSON index
//!
//! The pipeline entry point is [`Reconciler::run`]; everything else is
//! a stateless component it composes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod alias;
pub mod artifact;
pub mod channel;
pub mod checksum;
pub mod classifier;
pub mod config;
pub mod format;
pub mod platform;
pub mod reconciler;
pub mod retention;

pub use alias::LegacyAliasResolver;
pub use artifact::{pretty_size, Artifact, Platform};
pub use channel::{Channel, ChannelSelector};
pub use checksum::ChecksumEnricher;
pub use classifier::{Classification, KeyClassifier};
pub use config::{OnTransportError, RepoConfig, SelectionPolicy};
pub use format::{parse_channel, write_channel, ManifestEntry, RepoIndex};
pub use platform::PlatformMapper;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use retention::{RetentionPruner, VersionGroup};
