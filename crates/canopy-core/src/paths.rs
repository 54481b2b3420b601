//! Locating repository metadata from arbitrary paths.
//!
//! A working tree's `.git` entry is either the repository directory (main
//! worktree) or a file holding `gitdir: <admin dir>` (linked worktree). The
//! admin dir's `commondir` file leads back to the main repository.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

/// Resolved metadata locations for a path inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreePaths {
    /// Main working tree root.
    pub dir: PathBuf,
    /// Main repository directory (`<dir>/.git`).
    pub gitdir: PathBuf,
    /// `<gitdir>/worktrees`, when it exists.
    pub worktrees: Option<PathBuf>,
    /// Linked worktree root.
    pub worktree_dir: Option<PathBuf>,
    /// Linked worktree admin dir (`<gitdir>/worktrees/<name>`).
    pub worktree_gitdir: Option<PathBuf>,
    /// Linked worktree `.git` file pointing at `worktree_gitdir`.
    pub worktree_link: Option<PathBuf>,
}

impl WorktreePaths {
    /// Whether the queried path belongs to a linked worktree.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.worktree_gitdir.is_some()
    }

    /// Root of the working tree the queried path belongs to.
    #[must_use]
    pub fn working_root(&self) -> &Path {
        self.worktree_dir.as_deref().unwrap_or(&self.dir)
    }

    /// Admin dir holding this working tree's `HEAD` and index.
    #[must_use]
    pub fn admin_dir(&self) -> &Path {
        self.worktree_gitdir.as_deref().unwrap_or(&self.gitdir)
    }
}

/// Contents of a `HEAD` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// Symbolic ref; short name for `refs/heads/*`, full refname otherwise.
    Branch(String),
    /// Raw commit id.
    Detached(String),
}

impl Head {
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Branch(name) => Some(name),
            Self::Detached(_) => None,
        }
    }
}

/// What a path refers to on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(PathBuf),
    Directory(PathBuf),
    /// Known by name only; nothing exists at the path.
    Virtual(PathBuf),
}

impl Entry {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Directory(path) | Self::Virtual(path) => path,
        }
    }
}

/// Classify `path` by what currently exists there.
pub async fn describe_entry(path: impl AsRef<Path>) -> Entry {
    let path = path.as_ref().to_path_buf();
    match fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => Entry::Directory(path),
        Ok(_) => Entry::File(path),
        Err(_) => Entry::Virtual(path),
    }
}

/// Remove `.` and `..` components without touching the filesystem.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Absolute, symlink-free form of `path`. When `path` doesn't exist yet
/// its deepest existing ancestor is canonicalized and the rest appended.
///
/// # Errors
/// Returns error if the current directory or an ancestor can't be read.
pub async fn resolve_existing(path: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    let absolute = normalize(&std::path::absolute(path.as_ref())?);
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();

    loop {
        match fs::canonicalize(existing).await {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Ok(absolute),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Find the nearest ancestor of `path` (inclusive) containing `.git`.
pub async fn get_root(path: impl AsRef<Path>) -> Option<PathBuf> {
    let start = resolve_existing(path).await.ok()?;
    for dir in start.ancestors() {
        if fs::symlink_metadata(dir.join(".git")).await.is_ok() {
            debug!(root = %dir.display(), "found repository root");
            return Some(dir.to_path_buf());
        }
    }
    None
}

/// Parse the `gitdir: <path>` line of a `.git` file.
#[must_use]
pub fn parse_gitdir_pointer(content: &str) -> Option<&str> {
    let target = content.lines().next()?.strip_prefix("gitdir:")?.trim();
    (!target.is_empty()).then_some(target)
}

/// Follow a `.git` file to the admin dir it names. Relative targets are
/// resolved against the file's own directory.
pub(crate) async fn follow_link(dotgit: &Path) -> Result<PathBuf> {
    let content = fs::read_to_string(dotgit).await?;
    let target = parse_gitdir_pointer(&content).ok_or_else(|| Error::WorktreeLink {
        path: dotgit.to_path_buf(),
        reason: "missing 'gitdir:' line".into(),
    })?;

    let target = Path::new(target);
    let target = if target.is_absolute() {
        target.to_path_buf()
    } else {
        dotgit.parent().unwrap_or(Path::new("")).join(target)
    };

    match fs::canonicalize(&target).await {
        Ok(admin) => Ok(admin),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::WorktreeLink {
            path: dotgit.to_path_buf(),
            reason: format!("{} does not exist", target.display()),
        }),
        Err(e) => Err(e.into()),
    }
}

fn is_worktree_admin(admin: &Path) -> bool {
    admin
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == "worktrees")
}

/// Resolve main and linked worktree locations for `path`.
///
/// Returns `None` when `path` is not inside a repository.
///
/// # Errors
/// Returns `WorktreeLink` if a `.git` file or `commondir` can't be followed.
pub async fn get_worktree_paths(path: impl AsRef<Path>) -> Result<Option<WorktreePaths>> {
    let Some(root) = get_root(path).await else {
        return Ok(None);
    };
    let dotgit = root.join(".git");

    if fs::metadata(&dotgit).await?.is_dir() {
        let worktrees = dotgit.join("worktrees");
        let worktrees = fs::metadata(&worktrees)
            .await
            .is_ok_and(|m| m.is_dir())
            .then_some(worktrees);
        return Ok(Some(WorktreePaths {
            dir: root,
            gitdir: dotgit,
            worktrees,
            worktree_dir: None,
            worktree_gitdir: None,
            worktree_link: None,
        }));
    }

    let admin = follow_link(&dotgit).await?;
    let commondir_file = admin.join("commondir");
    let common = match fs::read_to_string(&commondir_file).await {
        Ok(content) => {
            let common = Path::new(content.trim());
            if common.is_absolute() {
                common.to_path_buf()
            } else {
                admin.join(common)
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound && !is_worktree_admin(&admin) => {
            debug!(gitdir = %admin.display(), "separate git dir");
            return Ok(Some(WorktreePaths {
                dir: root,
                gitdir: admin,
                worktrees: None,
                worktree_dir: None,
                worktree_gitdir: None,
                worktree_link: None,
            }));
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::WorktreeLink {
                path: commondir_file,
                reason: "missing commondir".into(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let gitdir = fs::canonicalize(&common)
        .await
        .map_err(|e| Error::WorktreeLink {
            path: commondir_file.clone(),
            reason: format!("{}: {e}", common.display()),
        })?;
    let dir = gitdir
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::WorktreeLink {
            path: commondir_file,
            reason: "repository has no working tree".into(),
        })?;

    Ok(Some(WorktreePaths {
        dir,
        worktrees: Some(gitdir.join("worktrees")),
        gitdir,
        worktree_dir: Some(root),
        worktree_gitdir: Some(admin),
        worktree_link: Some(dotgit),
    }))
}

/// Read `<gitdir>/HEAD`. `None` if the file doesn't exist.
///
/// # Errors
/// Returns `WorktreeLink` if the file holds neither a ref nor a commit id.
pub async fn read_head(gitdir: impl AsRef<Path>) -> Result<Option<Head>> {
    let file = gitdir.as_ref().join("HEAD");
    let content = match fs::read_to_string(&file).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let content = content.trim();

    if let Some(target) = content.strip_prefix("ref:") {
        let target = target.trim();
        let name = target.strip_prefix("refs/heads/").unwrap_or(target);
        return Ok(Some(Head::Branch(name.to_string())));
    }
    if is_object_id(content) {
        return Ok(Some(Head::Detached(content.to_string())));
    }

    Err(Error::WorktreeLink {
        path: file,
        reason: format!("unrecognized HEAD '{content}'"),
    })
}

pub(crate) fn is_object_id(s: &str) -> bool {
    matches!(s.len(), 40 | 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Admin dirs under `<gitdir>/worktrees`, sorted by name.
pub(crate) async fn admin_dirs(worktrees: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = match fs::read_dir(worktrees).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Working directory recorded in an admin dir's `gitdir` file.
pub(crate) async fn admin_worktree_dir(admin: &Path) -> Result<Option<PathBuf>> {
    let content = match fs::read_to_string(admin.join("gitdir")).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let link = Path::new(content.trim());
    let link = if link.is_absolute() {
        link.to_path_buf()
    } else {
        normalize(&admin.join(link))
    };
    Ok(link.parent().map(Path::to_path_buf))
}

/// Working tree that has `branch` checked out, if any.
///
/// # Errors
/// Returns error if admin files can't be read.
pub async fn get_branch_root(root: impl AsRef<Path>, branch: &str) -> Result<Option<PathBuf>> {
    let Some(paths) = get_worktree_paths(root).await? else {
        return Ok(None);
    };

    let main_head = read_head(&paths.gitdir).await?;
    if main_head.as_ref().and_then(Head::branch) == Some(branch) {
        return Ok(Some(paths.dir));
    }

    let worktrees = paths.gitdir.join("worktrees");
    let named = worktrees.join(branch);
    if read_head(&named).await?.as_ref().and_then(Head::branch) == Some(branch) {
        if let Some(dir) = admin_worktree_dir(&named).await? {
            return Ok(Some(dir));
        }
    }

    for (name, admin) in admin_dirs(&worktrees).await? {
        let head = read_head(&admin).await?;
        if head.as_ref().and_then(Head::branch) == Some(branch) {
            debug!(branch, admin = %name, "branch checked out in renamed worktree");
            return admin_worktree_dir(&admin).await;
        }
    }

    Ok(None)
}

/// `path` relative to `root` with `/` separators; empty for `root` itself.
pub(crate) fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
