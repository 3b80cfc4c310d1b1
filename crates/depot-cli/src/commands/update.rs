//! Update command - reconcile the bucket and write the manifests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use depot_core::FsBackend;
use depot_repo::{parse_channel, write_channel, Channel, ReconcileOutcome, Reconciler, RepoConfig, RepoIndex};

/// Consolidated index filename.
const INDEX_FILE: &str = "servers.json";

/// Arguments for the update command.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Root directory of the bucket mirror to reconcile.
    #[arg(long, env = "DEPOT_ROOT")]
    pub root: PathBuf,

    /// Directory the manifest files are written to.
    #[arg(long, env = "DEPOT_OUT")]
    pub out: PathBuf,
}

/// Execute the update command.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the reconciliation
/// aborts (`abort` transport policy), or a manifest cannot be written.
pub async fn execute(args: UpdateArgs) -> Result<()> {
    let config = RepoConfig::from_env().context("loading DEPOT_* configuration")?;
    let outcome = run_update(&args, config).await?;

    if outcome.has_errors() {
        eprintln!(
            "update completed with {} degraded step(s); see the log for details",
            outcome.errors.len()
        );
    } else {
        println!("update completed");
    }
    Ok(())
}

/// Runs one reconciliation and writes the manifest files.
///
/// Split from [`execute`] so tests can supply an explicit
/// [`RepoConfig`] instead of environment variables.
///
/// # Errors
///
/// Returns an error on invalid configuration, an aborted run, or a
/// manifest write failure.
pub async fn run_update(args: &UpdateArgs, config: RepoConfig) -> Result<ReconcileOutcome> {
    let backend = FsBackend::new(&args.root);
    let reconciler = Reconciler::new(backend, config.clone())?;
    let outcome = reconciler.run().await?;

    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let mut index = RepoIndex::new();
    let channels: [(&str, String, &Channel); 3] = [
        ("latest.xml", "latest".to_string(), &outcome.latest),
        ("stable.xml", config.stable_version.clone(), &outcome.stable),
        ("dev.xml", config.dev_version.clone(), &outcome.dev),
    ];

    for (file, label, channel) in channels {
        if channel.is_empty() {
            // No manifest file for an empty channel, but the index
            // still carries the key so consumers see a complete
            // document.
            tracing::info!(file, "channel is empty, skipping manifest");
            index.insert(label, Vec::new());
            continue;
        }

        let doc = write_channel(channel, &config.download_host);
        // Read the document back through the manifest parser before
        // publishing anything that depends on it.
        let entries = parse_channel(&doc)
            .with_context(|| format!("verifying generated manifest {file}"))?;

        let path = args.out.join(file);
        tokio::fs::write(&path, doc.as_bytes())
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(file, entries = entries.len(), "wrote channel manifest");

        index.insert(label, entries);
    }

    let json = index.to_json()?;
    let index_path = args.out.join(INDEX_FILE);
    tokio::fs::write(&index_path, json.as_bytes())
        .await
        .with_context(|| format!("writing {}", index_path.display()))?;
    tracing::info!(file = INDEX_FILE, "wrote consolidated index");

    Ok(outcome)
}
