//! Two-character porcelain status codes and their normalized form.
//!
//! `X` is the index-vs-HEAD column, `Y` is the worktree-vs-index column,
//! matching `git status --porcelain=v1`.

use std::fmt;

use git2::Status;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Normalized status of a single path.
///
/// `Unstaged*` variants are rendered with a leading `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GitStatus {
    #[serde(rename = "ignored")]
    Ignored,
    #[serde(rename = "unmodified")]
    Unmodified,
    #[serde(rename = "*modified")]
    UnstagedModified,
    #[serde(rename = "*deleted")]
    UnstagedDeleted,
    #[serde(rename = "*added")]
    UnstagedAdded,
    #[serde(rename = "absent")]
    Absent,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "deleted")]
    Deleted,
    #[serde(rename = "added")]
    Added,
    #[serde(rename = "unmerged")]
    Unmerged,
}

impl GitStatus {
    /// The canonical string form (`*modified`, `unmerged`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Unmodified => "unmodified",
            Self::UnstagedModified => "*modified",
            Self::UnstagedDeleted => "*deleted",
            Self::UnstagedAdded => "*added",
            Self::Absent => "absent",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Added => "added",
            Self::Unmerged => "unmerged",
        }
    }

    /// Whether the change only exists in the working tree.
    #[must_use]
    pub const fn is_unstaged(self) -> bool {
        matches!(
            self,
            Self::UnstagedModified | Self::UnstagedDeleted | Self::UnstagedAdded
        )
    }
}

impl fmt::Display for GitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn is_quiet_slot(c: char) -> bool {
    matches!(c, ' ' | 'M' | 'T' | 'D')
}

/// Map a two-character porcelain code to a [`GitStatus`].
///
/// Earlier rows win: `MM` is `modified`, not `*modified`. Anything outside
/// the table is reported as `unmodified` and logged.
#[must_use]
pub fn process_status_code(code: &str) -> GitStatus {
    let mut chars = code.chars();
    let (Some(x), Some(y), None) = (chars.next(), chars.next(), chars.next()) else {
        error!(code, "malformed porcelain status code");
        return GitStatus::Unmodified;
    };

    match (x, y) {
        ('!', '!') => GitStatus::Ignored,
        ('?', '?') => GitStatus::Absent,
        ('D', 'D') | ('A', 'A') | ('U', _) | (_, 'U') => GitStatus::Unmerged,
        ('M', y) if is_quiet_slot(y) => GitStatus::Modified,
        (x, 'M') if is_quiet_slot(x) => GitStatus::UnstagedModified,
        ('A', y) if is_quiet_slot(y) => GitStatus::Added,
        (_, 'A') => GitStatus::UnstagedAdded,
        ('D', _) => GitStatus::Deleted,
        (_, 'D') => GitStatus::UnstagedDeleted,
        _ => {
            error!(code, "unrecognized porcelain status code");
            GitStatus::Unmodified
        }
    }
}

/// Render libgit2 status flags as a porcelain `XY` code.
///
/// Conflicts collapse to `UU`; libgit2 doesn't distinguish the stages.
#[must_use]
pub fn porcelain_code(status: Status) -> String {
    if status.is_ignored() {
        return "!!".into();
    }
    if status.is_conflicted() {
        return "UU".into();
    }
    if status.is_wt_new() {
        return "??".into();
    }

    let x = if status.is_index_new() {
        'A'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_typechange() {
        'T'
    } else {
        ' '
    };

    let y = if status.is_wt_modified() {
        'M'
    } else if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else {
        ' '
    };

    format!("{x}{y}")
}
