use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::error::GatewayError;

/// Name prefix of imported copies; the retention sweeper expires them.
pub const LIBRARY_PREFIX: &str = "library_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryImport {
    /// File name inside the temp root, servable under `/files/`.
    pub temp_filename: String,
    pub original_path: PathBuf,
    pub size: u64,
}

/// Copy a local STL file into `temp_root` under a collision-free name.
pub async fn import_local_stl(
    path: &Path,
    temp_root: &Path,
) -> Result<LibraryImport, GatewayError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(not_found(path)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found(path)),
        Err(e) => return Err(GatewayError::Io(e)),
    };

    let is_stl = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("stl"))
        .unwrap_or(false);
    if !is_stl {
        return Err(GatewayError::Validation("File must be an STL file".to_string()));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model.stl".to_string());
    let token = Uuid::new_v4().simple().to_string();
    let temp_filename = format!("{LIBRARY_PREFIX}{}_{}", &token[..8], name);

    tokio::fs::create_dir_all(temp_root)
        .await
        .map_err(|e| GatewayError::Workdir {
            path: temp_root.to_path_buf(),
            source: e,
        })?;
    tokio::fs::copy(path, temp_root.join(&temp_filename)).await?;

    tracing::info!(
        original = %path.display(),
        temp_filename = %temp_filename,
        size = meta.len(),
        "library STL imported"
    );

    Ok(LibraryImport {
        temp_filename,
        original_path: path.to_path_buf(),
        size: meta.len(),
    })
}

fn not_found(path: &Path) -> GatewayError {
    GatewayError::NotFound(format!("STL file not found: {}", path.display()))
}
