use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::GatewayError;

/// Per-execution working directory, removed on drop unless kept.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    keep: bool,
}

impl WorkDir {
    /// Create `<root>/<prefix><uuid>`. The root is created if missing and the
    /// returned path is absolute.
    pub async fn create(root: &Path, prefix: &str) -> Result<Self, GatewayError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| GatewayError::Workdir {
                path: root.to_path_buf(),
                source: e,
            })?;
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| GatewayError::Workdir {
                path: root.to_path_buf(),
                source: e,
            })?;

        let path = root.join(format!("{prefix}{}", Uuid::new_v4().simple()));
        // create_dir (not create_dir_all) so a name collision surfaces as an error
        tokio::fs::create_dir(&path)
            .await
            .map_err(|e| GatewayError::Workdir {
                path: path.clone(),
                source: e,
            })?;

        tracing::debug!(workdir = %path.display(), "working directory created");
        Ok(Self { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Disarm cleanup and hand the directory over to the retention sweeper.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }

    /// Remove the directory off the async worker threads.
    ///
    /// The synchronous removal in `Drop` only runs when the owning future is
    /// cancelled before reaching this point.
    pub async fn discard(mut self) {
        self.keep = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => tracing::debug!(workdir = %self.path.display(), "working directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                workdir = %self.path.display(),
                error = %e,
                "failed to remove working directory"
            ),
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(workdir = %self.path.display(), "working directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                workdir = %self.path.display(),
                error = %e,
                "failed to remove working directory"
            ),
        }
    }
}
