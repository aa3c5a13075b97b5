//! Inspect command implementation.

use super::{open_existing, CommandResult, OutputFormat};
use litesync_store::{StoreStats, SyncStore};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database path.
    pub path: String,
    /// Database file size in bytes.
    pub file_size: u64,
    /// Row totals.
    pub stats: StoreStats,
    /// Item count of the requested client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientView>,
}

/// One client's item count.
#[derive(Debug, Serialize)]
pub struct ClientView {
    /// Client id.
    pub client_id: String,
    /// Rows owned by the client, shadow rows included.
    pub item_count: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, client: Option<&str>, format: OutputFormat) -> CommandResult<()> {
    let store = open_existing(path)?;
    let result = inspect(&store, path, client)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn inspect(store: &SyncStore, path: &Path, client: Option<&str>) -> CommandResult<InspectResult> {
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let client = client
        .map(|client_id| -> CommandResult<ClientView> {
            Ok(ClientView {
                client_id: client_id.to_owned(),
                item_count: store.get_client_item_count(client_id)?,
            })
        })
        .transpose()?;

    Ok(InspectResult {
        path: path.display().to_string(),
        file_size,
        stats: store.stats()?,
        client,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("LiteSync Store Inspection");
    println!("=========================");
    println!();
    println!("Path: {}", result.path);
    println!("Size: {}", format_size(result.file_size));
    println!();
    println!("Rows:");
    println!("  Total:       {}", result.stats.rows);
    println!("  Clients:     {}", result.stats.clients);
    println!("  Entities:    {}", result.stats.entities);
    println!("  Tombstones:  {}", result.stats.tombstones);
    println!("  Client tags: {}", result.stats.client_tags);
    println!("  Server tags: {}", result.stats.server_tags);

    if let Some(client) = &result.client {
        println!();
        println!("Client {}: {} items", client.client_id, client.item_count);
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}
