//! `canopy ls-remote` command - List refs advertised by a remote.

use anyhow::Result;
use canopy_core::{GitContext, RepositoryOperations};
use canopy_git::ServerRef;
use serde::Serialize;

use crate::output;

/// Run the ls-remote command.
pub async fn run(
    ctx: &GitContext,
    url: &str,
    prefix: Option<&str>,
    symrefs: bool,
    json: bool,
) -> Result<()> {
    let refs = RepositoryOperations::new(ctx)
        .list_server_refs(url, prefix, symrefs, None)
        .await?;

    if json {
        let refs: Vec<RefJson<'_>> = refs.iter().map(RefJson::from).collect();
        println!("{}", serde_json::to_string_pretty(&refs)?);
        return Ok(());
    }

    for server_ref in &refs {
        if let Some(target) = &server_ref.symref_target {
            output::essential(&format!("ref: {target}\t{}", server_ref.name));
        }
        output::essential(&format!("{}\t{}", server_ref.oid, server_ref.name));
    }
    Ok(())
}

#[derive(Serialize)]
struct RefJson<'a> {
    #[serde(rename = "ref")]
    name: &'a str,
    oid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
}

impl<'a> From<&'a ServerRef> for RefJson<'a> {
    fn from(server_ref: &'a ServerRef) -> Self {
        Self {
            name: &server_ref.name,
            oid: &server_ref.oid,
            target: server_ref.symref_target.as_deref(),
        }
    }
}
