//! File discovery module for finding video files to process.
//!
//! Walks the input tree depth-first with entries sorted by file name, so the
//! order is stable for a given filesystem snapshot. Symbolic links are never
//! followed. Unreadable entries are logged and skipped; only a bad root is an
//! error.

use crate::error::{CoreError, CoreResult};
use crate::utils::has_supported_extension;

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A validated input root that can be walked any number of times.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
    exclude: Option<PathBuf>,
}

/// Validates `input_root` and returns a restartable sequence of source files.
///
/// When `exclude` names a directory inside the input tree (typically the
/// output root), that subtree is never entered.
pub fn discover(input_root: &Path, exclude: Option<&Path>) -> CoreResult<Discovery> {
    let discovery_error = |message: String| CoreError::Discovery {
        root: input_root.to_path_buf(),
        message,
    };

    if !input_root.exists() {
        return Err(discovery_error("Directory does not exist".to_string()));
    }

    if !input_root.is_dir() {
        return Err(discovery_error("Not a directory".to_string()));
    }

    std::fs::read_dir(input_root)
        .map_err(|e| discovery_error(format!("Cannot read directory: {e}")))?;

    Ok(Discovery {
        root: input_root.to_path_buf(),
        exclude: exclude.map(Path::to_path_buf),
    })
}

impl Discovery {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a fresh walk over the tree.
    pub fn iter(&self) -> impl Iterator<Item = PathBuf> + '_ {
        // Resolved per walk: the excluded directory may only appear after discover().
        let excluded = self
            .exclude
            .as_deref()
            .and_then(|dir| dir.canonicalize().ok());

        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !is_hidden(entry) && !is_excluded(entry, excluded.as_deref()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("Skipping unreadable entry during discovery: {err}");
                    None
                }
            })
            .filter(|entry| {
                if entry.path_is_symlink() {
                    log::debug!("Skipping symbolic link: {}", entry.path().display());
                    return false;
                }
                entry.file_type().is_file()
            })
            .map(DirEntry::into_path)
            .filter(|path| has_supported_extension(path))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn is_excluded(entry: &DirEntry, excluded: Option<&Path>) -> bool {
    let Some(excluded) = excluded else {
        return false;
    };
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let hit = entry
        .path()
        .canonicalize()
        .is_ok_and(|resolved| resolved == excluded);
    if hit {
        log::debug!("Not descending into output directory {}", entry.path().display());
    }
    hit
}

/// Collects every supported file under `input_root`, in traversal order.
pub fn find_processable_files(input_root: &Path, exclude: Option<&Path>) -> CoreResult<Vec<PathBuf>> {
    let discovery = discover(input_root, exclude)?;
    let files: Vec<PathBuf> = discovery.iter().collect();

    log::info!(
        "Found {} video files under {}",
        files.len(),
        input_root.display()
    );
    for (i, file) in files.iter().take(5).enumerate() {
        log::debug!("  {}. {}", i + 1, file.display());
    }
    if files.len() > 5 {
        log::debug!("  ... and {} more files", files.len() - 5);
    }

    Ok(files)
}
