//! `canopy snapshot` command - Print state-store records for a repository.

use std::path::Path;

use anyhow::Result;
use canopy_core::{GitContext, RepositoryDescriptor, RepositoryOperations};

/// Run the snapshot command.
pub async fn run(ctx: &GitContext, path: &Path) -> Result<()> {
    let root = super::main_root(path).await?;
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let descriptor = RepositoryDescriptor {
        id: name.clone(),
        name,
        root,
        url: None,
        cors_proxy: None,
        local_branches: Vec::new(),
        remote_branches: Vec::new(),
        oauth: None,
        credentials: None,
    };

    let updates = RepositoryOperations::new(ctx)
        .repository_snapshot(&descriptor)
        .await?;
    println!("{}", serde_json::to_string_pretty(&updates)?);
    Ok(())
}
