//! Filesystem helpers.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

/// Recursively copy `src` into `dst`, skipping any entry whose name is in
/// `exclude`, the source's `.git/worktrees` registrations, and `dst` itself
/// when it lies inside `src`.
///
/// Symlinks are recreated rather than followed on unix. Returns the number of
/// files copied.
///
/// # Errors
/// Returns error if any entry can't be read or written.
pub async fn copy_dir(src: &Path, dst: &Path, exclude: &[String]) -> std::io::Result<usize> {
    let mut copied = 0;
    let mut stack: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = stack.pop() {
        fs::create_dir_all(&to).await?;
        let mut entries = fs::read_dir(&from).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if exclude.iter().any(|skip| name == skip.as_str()) {
                debug!(path = %entry.path().display(), "excluded from copy");
                continue;
            }

            let source = entry.path();
            if name == "worktrees" && from.file_name().is_some_and(|n| n == ".git") {
                continue;
            }
            if source == dst {
                debug!(path = %source.display(), "skipping copy destination");
                continue;
            }
            let target = to.join(&name);
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                stack.push((source, target));
            } else if file_type.is_symlink() {
                copy_symlink(&source, &target).await?;
            } else {
                fs::copy(&source, &target).await?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

#[cfg(unix)]
async fn copy_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    let link = fs::read_link(source).await?;
    fs::symlink(link, target).await
}

#[cfg(not(unix))]
async fn copy_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(source, target).await.map(|_| ())
}
