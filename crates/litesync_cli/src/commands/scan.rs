//! Scan command implementation.

use super::{open_existing, CommandResult, OutputFormat};
use litesync_store::{SyncEntity, TagItem};
use std::path::Path;

/// Runs the scan command.
pub fn run(path: &Path, tags: bool, format: OutputFormat) -> CommandResult<()> {
    let store = open_existing(path)?;

    if tags {
        let items = store.scan_tag_items()?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
            OutputFormat::Text => {
                for item in &items {
                    println!("{}", tag_line(item));
                }
                println!("{} tag rows", items.len());
            }
        }
    } else {
        let entities = store.scan_sync_entities()?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entities)?),
            OutputFormat::Text => {
                for entity in &entities {
                    println!("{}", entity_line(entity));
                }
                println!("{} entities", entities.len());
            }
        }
    }
    Ok(())
}

fn entity_line(entity: &SyncEntity) -> String {
    let mut line = format!(
        "{}/{} v{}",
        entity.client_id,
        entity.id,
        entity.version.map_or_else(|| "-".to_owned(), |v| v.to_string())
    );
    if let Some(data_type) = entity.data_type {
        line.push_str(&format!(" type={data_type}"));
    }
    if let Some(tag) = &entity.client_defined_unique_tag {
        line.push_str(&format!(" client_tag={tag}"));
    }
    if let Some(tag) = &entity.server_defined_unique_tag {
        line.push_str(&format!(" server_tag={tag}"));
    }
    if entity.is_folder() {
        line.push_str(" folder");
    }
    if entity.is_deleted() {
        line.push_str(" deleted");
    }
    line
}

fn tag_line(item: &TagItem) -> String {
    let kind = item.kind().map_or_else(|| "?".to_owned(), |k| k.to_string());
    format!(
        "{}/{} {} tag={}",
        item.client_id,
        item.id,
        kind,
        item.tag().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_line_lists_flags() {
        let entity = SyncEntity::new("c1", "e1")
            .with_version(3)
            .with_client_tag("t1")
            .with_deleted(true);
        assert_eq!(entity_line(&entity), "c1/e1 v3 client_tag=t1 deleted");
        assert_eq!(entity_line(&SyncEntity::new("c1", "e2")), "c1/e2 v-");
    }

    #[test]
    fn tag_line_names_kind() {
        let item = TagItem {
            client_id: "c1".into(),
            id: "Server#bookmarks".into(),
            mtime: Some(1),
            ctime: Some(1),
        };
        assert_eq!(tag_line(&item), "c1/Server#bookmarks server tag=bookmarks");
    }
}
