//! `canopy config` command - Read and write git config values.

use std::path::Path;

use anyhow::{Result, bail};
use canopy_core::{ConfigQuery, ConfigStore, GitContext, Scope};

use super::ConfigCommand;
use crate::output;

/// Run the config command.
pub async fn run(ctx: &GitContext, command: ConfigCommand) -> Result<()> {
    let store = ConfigStore::new(ctx);
    let cwd = Path::new(".");

    match command {
        ConfigCommand::Get {
            key,
            scope,
            show_origin,
        } => {
            let query = ConfigQuery {
                key: &key,
                local: !scope.global,
                global: !scope.local,
                show_origin,
            };
            let entry = store.get_config(cwd, &query).await?;
            let Some(value) = entry.value else {
                bail!("Key '{key}' is not set");
            };
            match entry.origin {
                Some(origin) => output::essential(&format!("file:{}\t{value}", origin.display())),
                None => output::essential(&value),
            }
        }
        ConfigCommand::Set { key, value, global } => {
            write(&store, cwd, scope(global), &key, Some(&value)).await?;
            output::success(&format!("Set {key}"));
        }
        ConfigCommand::Unset { key, global } => {
            write(&store, cwd, scope(global), &key, None).await?;
            output::success(&format!("Unset {key}"));
        }
    }

    Ok(())
}

const fn scope(global: bool) -> Scope {
    if global { Scope::Global } else { Scope::Local }
}

async fn write(
    store: &ConfigStore<'_>,
    dir: &Path,
    scope: Scope,
    key: &str,
    value: Option<&str>,
) -> Result<()> {
    if store.set_config(dir, scope, key, value).await?.is_none() {
        bail!("No readable {scope:?} config file to update");
    }
    Ok(())
}
