use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::GatewayError;

/// Remove retained entries older than `ttl`.
///
/// Only direct children of `root` whose name starts with one of `prefixes`
/// are considered: working directories are removed recursively, imported
/// files (and stray symlinks) are unlinked. Returns the number of entries
/// removed.
pub fn sweep_expired<S: AsRef<str>>(
    root: &Path,
    prefixes: &[S],
    ttl: Duration,
) -> Result<usize, GatewayError> {
    sweep_expired_at(root, prefixes, ttl, SystemTime::now())
}

fn sweep_expired_at<S: AsRef<str>>(
    root: &Path,
    prefixes: &[S],
    ttl: Duration,
    now: SystemTime,
) -> Result<usize, GatewayError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(GatewayError::Workdir {
                path: root.to_path_buf(),
                source: e,
            })
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !prefixes.iter().any(|p| name.starts_with(p.as_ref())) {
            continue;
        }
        // DirEntry::metadata does not traverse symlinks
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < ttl {
            continue;
        }

        let path = entry.path();
        let res = if meta.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match res {
            Ok(()) => {
                removed += 1;
                tracing::debug!(
                    path = %path.display(),
                    age_secs = age.as_secs(),
                    "expired retained entry removed"
                );
            }
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove expired retained entry"
            ),
        }
    }
    Ok(removed)
}

/// Run `sweep_expired` every `interval` until a shutdown signal arrives.
pub fn spawn_sweeper(
    root: PathBuf,
    prefixes: Vec<String>,
    ttl: Duration,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let root = root.clone();
                    let prefixes = prefixes.clone();
                    let res =
                        tokio::task::spawn_blocking(move || sweep_expired(&root, &prefixes, ttl))
                            .await;
                    match res {
                        Ok(Ok(0)) => {}
                        Ok(Ok(n)) => tracing::info!(removed = n, "retention sweep finished"),
                        Ok(Err(e)) => tracing::warn!(error = %e, "retention sweep failed"),
                        Err(e) => tracing::warn!(error = %e, "retention sweep task panicked"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("retention sweeper stopping");
                    break;
                }
            }
        }
    })
}
