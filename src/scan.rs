//! Directory scanning for PSD/PSB files
//!
//! Candidate files are found with glob patterns rooted at the scan directory:
//! `<root>/*` for a flat scan and `<root>/**/*` for a recursive one. Only
//! regular files with a `.psd` or `.psb` extension (any case) are yielded,
//! each real file once even when symlinks make it reachable by several paths.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use glob::{glob, Paths, Pattern};
use tracing::warn;
use crate::error::{Error, Result};

/// File extensions recognized as layered Photoshop documents (lowercase, no dot)
pub const PSD_EXTENSIONS: [&str; 2] = ["psd", "psb"];

/// Check whether a path carries a PSD/PSB extension (case-insensitive)
pub fn is_psd_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PSD_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Lazy sequence of candidate PSD/PSB paths under a root directory
///
/// Order follows the underlying directory listing and should not be relied on.
/// Use [`collect_psd_files`] with `sort = true` for a stable order.
pub struct PsdFiles {
    paths: Paths,
    /// Canonical forms of the paths already yielded
    seen: HashSet<PathBuf>,
}

impl std::fmt::Debug for PsdFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PsdFiles")
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}

impl Iterator for PsdFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.paths.by_ref() {
            match entry {
                // is_file() follows symlinks, so dangling links and
                // directories named like "x.psd" are dropped here
                Ok(path) => {
                    if !is_psd_path(&path) || !path.is_file() {
                        continue;
                    }
                    match fs::canonicalize(&path) {
                        Ok(real) => {
                            if self.seen.insert(real) {
                                return Some(path);
                            }
                        }
                        Err(e) => warn!("Skipping unresolvable path {}: {}", path.display(), e),
                    }
                }
                Err(e) => {
                    warn!("Skipping unreadable entry {}: {}", e.path().display(), e.error());
                }
            }
        }
        None
    }
}

/// Enumerate PSD/PSB files under `root`
///
/// With `recursive = false` only direct children of `root` are considered;
/// otherwise every descendant at any depth is considered. Symlinked
/// directories are followed, but a file reached again through another path
/// (or through a symlink loop) is only yielded the first time.
///
/// # Errors
///
/// Returns [`Error::DirectoryNotFound`] if `root` does not exist or is not a directory.
///
/// Returns [`Error::InvalidGlob`] if `root` exists but its path is not valid
/// UTF-8, since the walk is driven by a glob pattern built from it.
pub fn find_psd_files(root: &Path, recursive: bool) -> Result<PsdFiles> {
    if !root.is_dir() {
        return Err(Error::DirectoryNotFound(root.to_path_buf()));
    }

    let root_str = root.to_str().ok_or_else(|| {
        Error::InvalidGlob(format!("root path is not valid UTF-8: {}", root.display()))
    })?;

    // Escape the root so brackets or asterisks in directory names match literally
    let escaped = Pattern::escape(root_str);
    let base = escaped.trim_end_matches(['/', '\\']);
    let pattern = if recursive {
        format!("{}/**/*", base)
    } else {
        format!("{}/*", base)
    };

    Ok(PsdFiles { paths: glob(&pattern)?, seen: HashSet::new() })
}

/// Enumerate PSD/PSB files under `root` into a vector
///
/// When `sort` is set the paths are ordered ascending by their full path
/// string (byte-wise), independent of the directory listing order.
pub fn collect_psd_files(root: &Path, recursive: bool, sort: bool) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = find_psd_files(root, recursive)?.collect();

    if sort {
        sort_paths(&mut paths);
    }

    Ok(paths)
}

/// Sort paths by their full string form rather than component-wise
pub(crate) fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
}
