//! Fixtures shared by the unit tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Create `<tmp>/baseRepo` on branch `master` with one commit (`README.md`).
///
/// The returned root is canonical so it compares equal to resolved paths.
pub(crate) fn init_repo() -> (TempDir, PathBuf) {
    init_named_repo("baseRepo")
}

pub(crate) fn init_named_repo(name: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap().join(name);
    fs::create_dir(&root).unwrap();

    let repo = git2::Repository::init(&root).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }
    repo.set_head("refs/heads/master").unwrap();

    commit_file(&root, "README.md", "# Test Repo\n");
    (temp, root)
}

/// Write `name`, stage everything and commit on the current branch.
pub(crate) fn commit_file(root: &Path, name: &str, content: &str) -> git2::Oid {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();

    let repo = git2::Repository::open(root).unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = git2::Signature::now("Test User", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, &format!("add {name}"), &tree, &parents)
        .unwrap()
}

/// Create local branch `name` at HEAD.
pub(crate) fn create_branch(root: &Path, name: &str) {
    let repo = git2::Repository::open(root).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch(name, &head, false).unwrap();
}

/// Whether `refs/heads/<name>` exists.
pub(crate) fn branch_exists(root: &Path, name: &str) -> bool {
    let repo = git2::Repository::open(root).unwrap();
    repo.find_reference(&format!("refs/heads/{name}")).is_ok()
}
