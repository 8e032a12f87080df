use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::GatewayError;

const MAX_SCAN_DEPTH: usize = 16;
const MAX_SCAN_ENTRIES: usize = 50_000;

/// Find generated artifacts under `dir`.
///
/// Files are matched recursively by extension (case-insensitive) against
/// `extensions` and ordered by the extension's position in that list, then
/// by path. Symlinks are never followed or reported, and the walk stops at
/// `MAX_SCAN_DEPTH` levels or `MAX_SCAN_ENTRIES` entries. When nothing
/// matches and `output_filename` names a regular file directly inside `dir`,
/// that file is the only output.
pub fn discover_outputs(
    dir: &Path,
    extensions: &[String],
    output_filename: Option<&str>,
) -> Result<Vec<PathBuf>, GatewayError> {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .max_depth(MAX_SCAN_DEPTH)
        .into_iter();

    let mut found: Vec<(usize, PathBuf)> = Vec::new();
    for (seen, entry) in walker.enumerate() {
        if seen >= MAX_SCAN_ENTRIES {
            tracing::warn!(
                dir = %dir.display(),
                limit = MAX_SCAN_ENTRIES,
                "output scan truncated"
            );
            break;
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during output scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(rank) = extension_rank(entry.path(), extensions) {
            found.push((rank, entry.into_path()));
        }
    }
    found.sort();

    let mut outputs: Vec<PathBuf> = found.into_iter().map(|(_, p)| p).collect();
    if outputs.is_empty() {
        if let Some(name) = output_filename {
            let candidate = dir.join(name);
            let is_file = std::fs::symlink_metadata(&candidate)
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file {
                outputs.push(candidate);
            }
        }
    }
    Ok(outputs)
}

fn extension_rank(path: &Path, extensions: &[String]) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    extensions
        .iter()
        .position(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn exts() -> Vec<String> {
        ["stl", "step", "stp", "obj", "3mf"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let p = dir.join(rel);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&p, b"x").unwrap();
        p
    }

    #[test]
    fn orders_by_extension_priority_then_name() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        let step = touch(d, "a.step");
        let stl_b = touch(d, "b.stl");
        let stl_a = touch(d, "a.STL");
        let obj = touch(d, "nested/part.obj");
        touch(d, "model.py");
        touch(d, "preview.png");

        let out = discover_outputs(d, &exts(), None).unwrap();
        assert_eq!(out, vec![stl_a, stl_b, step, obj]);
    }

    #[test]
    fn falls_back_to_named_output() {
        let dir = tempfile::tempdir().unwrap();
        let custom = touch(dir.path(), "part.brep");

        let out = discover_outputs(dir.path(), &exts(), Some("part.brep")).unwrap();
        assert_eq!(out, vec![custom]);
    }

    #[test]
    fn named_output_ignored_when_recognized_files_exist() {
        let dir = tempfile::tempdir().unwrap();
        let stl = touch(dir.path(), "result.stl");
        touch(dir.path(), "part.brep");

        let out = discover_outputs(dir.path(), &exts(), Some("part.brep")).unwrap();
        assert_eq!(out, vec![stl]);
    }

    #[test]
    fn nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "log.txt");

        let out = discover_outputs(dir.path(), &exts(), Some("missing.stl")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn directories_with_recognized_suffix_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cache.stl")).unwrap();

        let out = discover_outputs(dir.path(), &exts(), None).unwrap();
        assert!(out.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loops_are_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        for name in ["a", "b", "c"] {
            symlink(".", d.join(name)).unwrap();
        }
        let stl = touch(d, "x.stl");
        symlink(&stl, d.join("alias.stl")).unwrap();
        symlink("/etc/hostname", d.join("host.stl")).unwrap();

        let started = std::time::Instant::now();
        let out = discover_outputs(d, &exts(), Some("host.stl")).unwrap();

        assert_eq!(out, vec![stl]);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_named_output_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let secret = touch(outside.path(), "secret.brep");
        std::os::unix::fs::symlink(&secret, dir.path().join("part.brep")).unwrap();

        let out = discover_outputs(dir.path(), &exts(), Some("part.brep")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn scan_depth_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let shallow = touch(dir.path(), "top.stl");
        let deep_rel = format!("{}deep.stl", "d/".repeat(MAX_SCAN_DEPTH + 1));
        touch(dir.path(), &deep_rel);

        let out = discover_outputs(dir.path(), &exts(), None).unwrap();
        assert_eq!(out, vec![shallow]);
    }
}
