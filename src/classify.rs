//! Per-kind "is this unused" rules over raw runtime records.

use crate::resource::{field, Record, ResourceItem, ResourceKind};
use crate::size::parse_size;
use regex::Regex;
use std::sync::OnceLock;

/// Marker the runtime prints for a missing repository or tag.
pub const NONE_SENTINEL: &str = "<none>";

/// Networks the runtime creates itself and never lets you remove.
pub const RESERVED_NETWORKS: &[&str] = &["bridge", "host", "none"];

const CONTAINER_REMOVABLE_STATES: &[&str] = &["exited", "dead"];

/// Stopped containers: state `exited` or `dead`.
pub fn classify_containers(records: &[Record]) -> Vec<ResourceItem> {
    records
        .iter()
        .filter(|record| {
            field(record, &["State", "state"])
                .map(|state| CONTAINER_REMOVABLE_STATES.contains(&state.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|record| ResourceItem {
            id: field(record, &["ID", "Id", "id"]).unwrap_or_default(),
            name: field(record, &["Names", "Name", "name"]).unwrap_or_default(),
            size: field(record, &["Size", "size"]),
            created_at: field(record, &["CreatedAt", "Created", "created"]),
            last_used: field(record, &["Status", "status", "RunningFor"]),
            raw: record.clone(),
        })
        .collect()
}

/// Dangling images only, unless `all_images` keeps every listed image.
pub fn classify_images(records: &[Record], all_images: bool) -> Vec<ResourceItem> {
    records
        .iter()
        .filter(|record| {
            if all_images {
                return true;
            }
            let repository = field(record, &["Repository", "repository"]);
            let tag = field(record, &["Tag", "tag"]);
            repository.as_deref() == Some(NONE_SENTINEL) || tag.as_deref() == Some(NONE_SENTINEL)
        })
        .map(|record| {
            let repository = field(record, &["Repository", "repository"]).unwrap_or_default();
            let tag = field(record, &["Tag", "tag"]).unwrap_or_default();
            ResourceItem {
                id: field(record, &["ID", "Id", "id"]).unwrap_or_default(),
                name: format!("{}:{}", repository, tag),
                size: field(record, &["Size", "size"]),
                created_at: field(record, &["CreatedAt", "Created", "created"]),
                last_used: field(record, &["CreatedSince"]),
                raw: record.clone(),
            }
        })
        .collect()
}

/// Volumes arrive already filtered to dangling ones, so all are kept.
pub fn classify_volumes(records: &[Record]) -> Vec<ResourceItem> {
    records
        .iter()
        .map(|record| {
            let name = field(record, &["Name", "name"]).unwrap_or_default();
            ResourceItem {
                id: name.clone(),
                name,
                size: None,
                created_at: field(record, &["CreatedAt", "Created"]),
                last_used: field(record, &["Driver", "driver"]),
                raw: record.clone(),
            }
        })
        .collect()
}

/// Everything except the runtime's reserved networks (exact, case-sensitive).
pub fn classify_networks(records: &[Record]) -> Vec<ResourceItem> {
    records
        .iter()
        .filter_map(|record| {
            let name = field(record, &["Name", "name"]).unwrap_or_default();
            if RESERVED_NETWORKS.contains(&name.as_str()) {
                return None;
            }
            Some(ResourceItem {
                id: field(record, &["ID", "Id", "id"]).unwrap_or_default(),
                name,
                size: None,
                created_at: field(record, &["CreatedAt", "Created"]),
                last_used: field(record, &["Driver", "driver"]),
                raw: record.clone(),
            })
        })
        .collect()
}

fn cache_total_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^\s*Total(?: reclaimable| reclaimed space)?:\s*(.+?)\s*$")
            .expect("valid cache total regex")
    })
}

/// Extract the byte total from build cache prune output.
///
/// Recognises the dry-run `Total reclaimable: <size>` line as well as the
/// `Total reclaimed space:` and `Total:` lines printed by a real prune.
pub fn cache_reclaimable(output: &str) -> u64 {
    cache_total_pattern()
        .captures_iter(output)
        .map(|caps| parse_size(&caps[1]))
        .find(|bytes| *bytes > 0)
        .unwrap_or(0)
}

/// Classify records of any addressable kind.
pub fn classify(kind: ResourceKind, records: &[Record], all_images: bool) -> Vec<ResourceItem> {
    match kind {
        ResourceKind::Containers => classify_containers(records),
        ResourceKind::Images => classify_images(records, all_images),
        ResourceKind::Volumes => classify_volumes(records),
        ResourceKind::Networks => classify_networks(records),
        ResourceKind::Cache => Vec::new(),
    }
}
