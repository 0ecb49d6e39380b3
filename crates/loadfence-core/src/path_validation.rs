//! Path validation utilities.
//!
//! Keeps containment comparisons on normalized paths so `..` segments and
//! symlinked directories cannot smuggle a request outside the allowed root.

use anyhow::Result;
use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Remove `.` and `..` segments without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    path.clean()
}

/// Canonicalize the longest existing ancestor of `path` and append the rest.
///
/// Works for paths that do not exist yet (e.g. an identifier before extension
/// probing), while still resolving symlinks in the directories that do.
pub fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let cleaned = path.clean();
    let mut existing = cleaned.as_path();
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut out = canonical;
            for segment in rest.iter().rev() {
                out.push(segment);
            }
            return out.clean();
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => return cleaned,
        }
    }
}

/// True when `path` is not `root` or a descendant of it.
///
/// Both sides must already be normalized the same way. Component-wise, so
/// `/app2` does not count as inside `/app`.
pub fn escapes_root(path: &Path, root: &Path) -> bool {
    !path.starts_with(root)
}

/// Canonicalize a boundary directory, failing when it does not exist or is a file.
pub fn canonical_root(root: &Path) -> Result<PathBuf> {
    let canonical = root
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("Invalid root {}: {}", root.display(), e))?;
    if !canonical.is_dir() {
        anyhow::bail!("Root is not a directory: {}", root.display());
    }
    Ok(canonical)
}
