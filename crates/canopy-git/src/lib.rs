//! # canopy-git
//!
//! Git operations abstraction layer for Canopy, built on git2-rs.
//! Provides branch and ref management, checkout, commit and merge,
//! porcelain status codes, the status matrix, and network clone/ls-remote.

mod commit;
mod error;
mod porcelain;
mod remote;
mod repository;
mod status;

pub use commit::{CommitRequest, MergeOutcome};
pub use error::{Error, Result};
pub use git2::{Oid, Signature, Status};
pub use porcelain::{GitStatus, porcelain_code, process_status_code};
pub use remote::{CloneRequest, Credential, NoHooks, RemoteInfo, ServerRef, TransferHooks};
pub use repository::{CheckoutRequest, Repository};
pub use status::{MatrixRow, StatusEntry};
