//! Init command implementation.

use super::CommandResult;
use litesync_store::{StoreConfig, SyncStore};
use std::path::Path;
use tracing::info;

/// Runs the init command. Safe to repeat on an initialized store.
pub fn run(path: &Path) -> CommandResult<()> {
    let store = SyncStore::open(&StoreConfig::new(path))?;
    let definitions = store.schema_definitions()?;
    info!(path = %path.display(), objects = definitions.len(), "schema ready");
    println!("Initialized {}", path.display());
    Ok(())
}
