//! Resource tree enumeration
//!
//! Lists the files under a resource root as `/`-separated relative paths,
//! sorted by file name at each level so the listing is deterministic.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Errors while walking a resource tree
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Path not in resource tree: {0}")]
    PathNotInTree(PathBuf),

    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8(PathBuf),
}

/// Relative paths of every file under `root`
pub fn walk_resources(root: &Path) -> Result<Vec<String>, TreeError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| TreeError::PathNotInTree(entry.path().to_path_buf()))?;

        let mut segments = Vec::new();
        for component in rel_path.components() {
            let segment = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| TreeError::NonUtf8(rel_path.to_path_buf()))?;
            segments.push(segment);
        }
        paths.push(segments.join("/"));
    }

    tracing::debug!(root = %root.display(), files = paths.len(), "walked resource tree");
    Ok(paths)
}
