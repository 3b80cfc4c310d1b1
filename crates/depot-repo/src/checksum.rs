//! Checksum sidecar enrichment.
//!
//! Each published artifact may have a sidecar object at
//! `path + checksum_suffix` containing its content digest. Probes are
//! issued one artifact at a time, in path order, to keep object-store
//! request volume predictable and output ordering deterministic.

use depot_core::{Result, StorageBackend};

use crate::channel::Channel;
use crate::config::OnTransportError;

/// Attaches sidecar checksums to channel artifacts.
pub struct ChecksumEnricher<'a> {
    backend: &'a dyn StorageBackend,
    suffix: &'a str,
    on_transport_error: OnTransportError,
}

impl<'a> ChecksumEnricher<'a> {
    /// Creates an enricher probing `path + suffix` sidecars.
    #[must_use]
    pub fn new(
        backend: &'a dyn StorageBackend,
        suffix: &'a str,
        on_transport_error: OnTransportError,
    ) -> Self {
        Self {
            backend,
            suffix,
            on_transport_error,
        }
    }

    /// Enriches every artifact in the channel, in path order.
    ///
    /// A missing sidecar or an unrecognizable body is not an error; the
    /// artifact is simply emitted without a checksum. Other transport
    /// failures follow the configured policy: `degrade` logs and
    /// records the failure, `abort` propagates it.
    ///
    /// Returns the non-fatal failure messages recorded in degrade mode.
    ///
    /// # Errors
    ///
    /// Returns the first transport error when the policy is `abort`.
    pub async fn enrich(&self, channel: &mut Channel) -> Result<Vec<String>> {
        let mut errors = Vec::new();

        for artifact in channel.artifacts_mut() {
            let sidecar = format!("{}{}", artifact.path, self.suffix);

            match self.backend.get(&sidecar).await {
                Ok(body) => {
                    let text = String::from_utf8_lossy(&body);
                    match extract_digest(&text) {
                        Some(digest) => artifact.checksum = Some(digest),
                        None => {
                            tracing::debug!(path = %sidecar, "sidecar body has no digest token");
                        }
                    }
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => match self.on_transport_error {
                    OnTransportError::Abort => return Err(e),
                    OnTransportError::Degrade => {
                        tracing::warn!(path = %sidecar, error = %e, "checksum probe failed");
                        errors.push(format!("checksum {sidecar}: {e}"));
                    }
                },
            }
        }

        Ok(errors)
    }
}

/// Extracts the first 32-character hexadecimal token from a sidecar
/// body (the conventional `<digest>  <filename>` layout, but any
/// placement is accepted).
fn extract_digest(body: &str) -> Option<String> {
    body.split_whitespace()
        .find(|token| token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|token| token.to_ascii_lowercase())
}
