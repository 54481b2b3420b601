//! Integration tests for the canopy CLI.
//!
//! These tests verify the CLI commands work correctly end-to-end.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;
use tempfile::TempDir;

/// Run git in `dir`, panicking on failure.
fn git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Helper to create a git repository in a temp directory.
fn setup_git_repo() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");

    git(temp.path(), &["init"]);
    git(temp.path(), &["config", "user.email", "test@example.com"]);
    git(temp.path(), &["config", "user.name", "Test User"]);

    // Create initial commit so we have a valid HEAD
    fs::write(temp.path().join("README.md"), "# Test Repo\n").expect("Failed to write README");
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-m", "Initial commit"]);

    // Rename branch to main (in case default is master)
    git(temp.path(), &["branch", "-M", "main"]);

    temp
}

/// Helper to create a commit touching `feature.txt`.
fn git_commit(msg: &str, dir: &Path) {
    let file = dir.join("feature.txt");
    let mut current = fs::read_to_string(&file).unwrap_or_default();
    current.push_str("\nnew line");
    fs::write(&file, &current).expect("Failed to write file");

    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", msg]);
}

/// Helper to get canopy command.
fn canopy() -> Command {
    Command::new(env!("CARGO_BIN_EXE_canopy"))
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn test_version_flag() {
    canopy()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("canopy"));
}

#[test]
fn test_help_flag() {
    canopy()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("worktree"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("merge"));
}

#[test]
fn test_no_subcommand_shows_help() {
    canopy()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

// ============================================================================
// Path resolution tests
// ============================================================================

#[test]
fn test_root_from_subdirectory() {
    let temp = setup_git_repo();
    let nested = temp.path().join("src").join("deep");
    fs::create_dir_all(&nested).unwrap();
    let expected = fs::canonicalize(temp.path()).unwrap();

    canopy()
        .arg("root")
        .current_dir(&nested)
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_root_not_in_git_repo() {
    let temp = TempDir::new().unwrap();

    canopy()
        .arg("root")
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("git repository"));
}

#[test]
fn test_paths_json() {
    let temp = setup_git_repo();

    let output = canopy()
        .args(["paths", "--json"])
        .current_dir(&temp)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["gitdir"].as_str().unwrap().ends_with(".git"));
    assert!(json["worktree_gitdir"].is_null());
}

// ============================================================================
// Status tests
// ============================================================================

#[test]
fn test_status_clean() {
    let temp = setup_git_repo();

    canopy()
        .arg("status")
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("main"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn test_status_reports_changes() {
    let temp = setup_git_repo();
    fs::write(temp.path().join("README.md"), "# Changed\n").unwrap();
    fs::write(temp.path().join("new.txt"), "new\n").unwrap();

    canopy()
        .arg("status")
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("*modified"))
        .stdout(predicate::str::contains("README.md"))
        .stdout(predicate::str::contains("absent"))
        .stdout(predicate::str::contains("new.txt"));
}

#[test]
fn test_status_json() {
    let temp = setup_git_repo();
    fs::write(temp.path().join("README.md"), "# Changed\n").unwrap();
    git(temp.path(), &["add", "README.md"]);

    let output = canopy()
        .args(["status", "--json"])
        .current_dir(&temp)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["ref"], "main");
    assert_eq!(json["status"], "uncommitted");
    assert_eq!(json["entries"]["README.md"], "modified");
}

// ============================================================================
// Worktree tests
// ============================================================================

#[test]
fn test_worktree_add_list_remove() {
    let temp = setup_git_repo();
    git(temp.path(), &["branch", "feature"]);
    let parent = TempDir::new().unwrap();
    let target = parent.path().join("feature-wt");

    canopy()
        .args(["worktree", "add"])
        .arg(&target)
        .arg("feature")
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created worktree"));
    assert!(target.join("README.md").exists());
    assert!(target.join(".git").is_file());

    canopy()
        .args(["worktree", "list"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("feature-wt"))
        .stdout(predicate::str::contains("feature"));

    canopy()
        .args(["branch-root", ".", "feature"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("feature-wt"));

    canopy()
        .args(["worktree", "remove"])
        .arg(&target)
        .current_dir(&temp)
        .assert()
        .success();
    assert!(!target.exists());
    assert!(git(temp.path(), &["branch", "--list", "feature"]).is_empty());
}

#[test]
fn test_worktree_add_branch_already_checked_out() {
    let temp = setup_git_repo();
    let parent = TempDir::new().unwrap();

    canopy()
        .args(["worktree", "add"])
        .arg(parent.path().join("dup"))
        .arg("main")
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("main"));
}

#[test]
fn test_worktree_remove_dirty_needs_force() {
    let temp = setup_git_repo();
    git(temp.path(), &["branch", "wip"]);
    let parent = TempDir::new().unwrap();
    let target = parent.path().join("wip");

    canopy()
        .args(["worktree", "add"])
        .arg(&target)
        .arg("wip")
        .current_dir(&temp)
        .assert()
        .success();
    fs::write(target.join("README.md"), "dirty\n").unwrap();

    canopy()
        .args(["worktree", "remove"])
        .arg(&target)
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert!(target.exists());

    canopy()
        .args(["worktree", "remove", "--force"])
        .arg(&target)
        .current_dir(&temp)
        .assert()
        .success();
    assert!(!target.exists());
}

// ============================================================================
// Config tests
// ============================================================================

#[test]
fn test_config_get_local_then_global() {
    let temp = setup_git_repo();
    let global = TempDir::new().unwrap();
    let global_file = global.path().join("gitconfig");
    fs::write(&global_file, "[core]\n\teditor = vim\n").unwrap();

    canopy()
        .args(["config", "get", "user.name", "--global-config"])
        .arg(&global_file)
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("Test User"));

    canopy()
        .args(["config", "get", "core.editor", "--global-config"])
        .arg(&global_file)
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("vim"));

    canopy()
        .args(["config", "get", "user.name", "--global", "--global-config"])
        .arg(&global_file)
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not set"));
}

#[test]
fn test_config_set_and_unset() {
    let temp = setup_git_repo();

    canopy()
        .args(["config", "set", "canopy.flavour", "pine"])
        .current_dir(&temp)
        .assert()
        .success();
    assert_eq!(git(temp.path(), &["config", "--get", "canopy.flavour"]), "pine");

    canopy()
        .args(["config", "unset", "canopy.flavour"])
        .current_dir(&temp)
        .assert()
        .success();
    assert!(
        !fs::read_to_string(temp.path().join(".git/config"))
            .unwrap()
            .contains("pine")
    );
}

#[test]
fn test_config_set_global_without_file_fails() {
    let temp = setup_git_repo();
    let global = TempDir::new().unwrap();

    canopy()
        .args(["config", "set", "user.name", "Nobody", "--global", "--global-config"])
        .arg(global.path().join("missing"))
        .current_dir(&temp)
        .assert()
        .failure();
}

// ============================================================================
// Branch, checkout and commit tests
// ============================================================================

#[test]
fn test_branch_create_show_delete() {
    let temp = setup_git_repo();

    canopy()
        .arg("branch")
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("main"));

    canopy()
        .args(["branch", "topic"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created branch"));
    assert_eq!(git(temp.path(), &["branch", "--list", "topic"]), "topic");

    canopy()
        .args(["branch", "-d", "topic"])
        .current_dir(&temp)
        .assert()
        .success();
    assert!(git(temp.path(), &["branch", "--list", "topic"]).is_empty());
}

#[test]
fn test_branch_invalid_name() {
    let temp = setup_git_repo();

    canopy()
        .args(["branch", "bad..name"])
        .current_dir(&temp)
        .assert()
        .failure();
}

#[test]
fn test_checkout_switches_branch() {
    let temp = setup_git_repo();
    git(temp.path(), &["checkout", "-b", "feature"]);
    git_commit("Feature commit", temp.path());
    git(temp.path(), &["checkout", "main"]);
    assert!(!temp.path().join("feature.txt").exists());

    canopy()
        .args(["checkout", "feature"])
        .current_dir(&temp)
        .assert()
        .success();

    assert!(temp.path().join("feature.txt").exists());
    assert_eq!(git(temp.path(), &["rev-parse", "--abbrev-ref", "HEAD"]), "feature");
}

#[test]
fn test_checkout_restores_paths() {
    let temp = setup_git_repo();
    fs::write(temp.path().join("README.md"), "scribbled\n").unwrap();

    canopy()
        .args(["checkout", "main", "--force", "--", "README.md"])
        .current_dir(&temp)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(temp.path().join("README.md")).unwrap(),
        "# Test Repo\n"
    );
}

#[test]
fn test_commit_staged_changes() {
    let temp = setup_git_repo();
    fs::write(temp.path().join("notes.txt"), "notes\n").unwrap();
    git(temp.path(), &["add", "notes.txt"]);

    canopy()
        .args(["commit", "-m", "Add notes"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("Committed"));

    assert_eq!(git(temp.path(), &["log", "-1", "--format=%s"]), "Add notes");
    assert_eq!(
        git(temp.path(), &["log", "-1", "--format=%an <%ae>"]),
        "Test User <test@example.com>"
    );
}

#[test]
fn test_commit_no_update_branch_keeps_head() {
    let temp = setup_git_repo();
    let before = git(temp.path(), &["rev-parse", "HEAD"]);
    fs::write(temp.path().join("notes.txt"), "notes\n").unwrap();
    git(temp.path(), &["add", "notes.txt"]);

    canopy()
        .args(["commit", "-m", "Floating", "--no-update-branch"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("no ref moved"));

    assert_eq!(git(temp.path(), &["rev-parse", "HEAD"]), before);
}

// ============================================================================
// Merge tests
// ============================================================================

#[test]
fn test_merge_fast_forward() {
    let temp = setup_git_repo();
    git(temp.path(), &["checkout", "-b", "feature"]);
    git_commit("Feature commit", temp.path());
    let feature = git(temp.path(), &["rev-parse", "feature"]);
    git(temp.path(), &["checkout", "main"]);

    canopy()
        .args(["merge", "main", "feature"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("fast-forward"));

    assert_eq!(git(temp.path(), &["rev-parse", "main"]), feature);
}

#[test]
fn test_merge_json_up_to_date() {
    let temp = setup_git_repo();
    git(temp.path(), &["branch", "same"]);

    let output = canopy()
        .args(["merge", "main", "same", "--json"])
        .current_dir(&temp)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["result"], "up_to_date");
    assert!(json.get("missing_configs").is_none());
}

// ============================================================================
// Remote tests
// ============================================================================

#[test]
fn test_ls_remote_local_path() {
    let temp = setup_git_repo();
    let url = temp.path().display().to_string();

    canopy()
        .args(["ls-remote", &url, "--prefix", "refs/heads/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("refs/heads/main"));
}

#[test]
fn test_clone_local_path() {
    let source = setup_git_repo();
    let parent = TempDir::new().unwrap();
    let dest = parent.path().join("copy");

    canopy()
        .arg("clone")
        .arg(source.path())
        .arg(&dest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cloned into"));

    assert!(dest.join("README.md").exists());
    assert_eq!(git(&dest, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
}

// ============================================================================
// Snapshot tests
// ============================================================================

#[test]
fn test_snapshot_records() {
    let temp = setup_git_repo();

    let output = canopy()
        .arg("snapshot")
        .current_dir(&temp)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records[0]["kind"], "repository");
    assert!(records.iter().any(|r| r["kind"] == "branch"));
    assert!(records.iter().any(|r| r["kind"] == "commit"));
}

// ============================================================================
// Quiet mode tests
// ============================================================================

#[test]
fn test_quiet_suppresses_success_output() {
    let temp = setup_git_repo();

    canopy()
        .args(["--quiet", "branch", "quiet-topic"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
