//! Resource kinds, discovered items and the results of scan and cleanup passes.

use crate::size::parse_opt_size;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One raw inventory record as returned by the runtime.
pub type Record = Map<String, Value>;

/// The five kinds of cleanable runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Containers,
    Images,
    Volumes,
    Networks,
    Cache,
}

impl ResourceKind {
    /// All kinds, in scan order.
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Containers,
        ResourceKind::Images,
        ResourceKind::Volumes,
        ResourceKind::Networks,
        ResourceKind::Cache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Containers => "containers",
            ResourceKind::Images => "images",
            ResourceKind::Volumes => "volumes",
            ResourceKind::Networks => "networks",
            ResourceKind::Cache => "cache",
        }
    }

    /// Human label for a scan summary of this kind.
    pub fn label(&self, all_images: bool) -> &'static str {
        match self {
            ResourceKind::Containers => "Stopped containers",
            ResourceKind::Images if all_images => "Unused images",
            ResourceKind::Images => "Dangling images",
            ResourceKind::Volumes => "Unused volumes",
            ResourceKind::Networks => "Unused networks",
            ResourceKind::Cache => "Build cache",
        }
    }

    /// Whether items of this kind can be removed one identifier at a time.
    pub fn is_addressable(&self) -> bool {
        !matches!(self, ResourceKind::Cache)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered unit of cleanable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
    pub id: String,
    pub name: String,
    /// Size string as reported by the runtime. Volumes and networks have none.
    pub size: Option<String>,
    pub created_at: Option<String>,
    /// Status text, for display only
    pub last_used: Option<String>,
    pub raw: Record,
}

impl ResourceItem {
    pub fn size_bytes(&self) -> u64 {
        parse_opt_size(self.size.as_deref())
    }
}

/// Scan result for a single resource kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub kind: ResourceKind,
    pub label: String,
    pub items: Vec<ResourceItem>,
    /// Sum of the parsed sizes of `items`, or the cache preview estimate.
    pub reclaimable_bytes: u64,
}

impl ResourceSummary {
    pub fn new(kind: ResourceKind, label: &str, items: Vec<ResourceItem>) -> Self {
        let reclaimable_bytes = items.iter().map(ResourceItem::size_bytes).sum();
        ResourceSummary {
            kind,
            label: label.to_string(),
            items,
            reclaimable_bytes,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.id.clone())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// Ordered summaries for the requested kinds plus the overall estimate.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub summaries: Vec<ResourceSummary>,
    pub total_reclaimable_bytes: u64,
}

impl ScanResult {
    pub fn total_items(&self) -> usize {
        self.summaries.iter().map(|s| s.items.len()).sum()
    }

    pub fn summary(&self, kind: ResourceKind) -> Option<&ResourceSummary> {
        self.summaries.iter().find(|s| s.kind == kind)
    }

    /// True when nothing was found and no space is reclaimable.
    pub fn is_empty(&self) -> bool {
        self.total_items() == 0 && self.total_reclaimable_bytes == 0
    }
}

/// Cleanup outcome for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindOutcome {
    pub kind: ResourceKind,
    pub removed: usize,
    pub failures: Vec<String>,
}

/// Removed counts and failures per kind, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResult {
    pub outcomes: Vec<KindOutcome>,
    pub reclaimed_bytes: u64,
}

impl CleanResult {
    pub fn removed(&self, kind: ResourceKind) -> usize {
        self.outcome(kind).map(|o| o.removed).unwrap_or(0)
    }

    pub fn failures(&self, kind: ResourceKind) -> &[String] {
        self.outcome(kind)
            .map(|o| o.failures.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_removed(&self) -> usize {
        self.outcomes.iter().map(|o| o.removed).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.failures.is_empty())
    }

    fn outcome(&self, kind: ResourceKind) -> Option<&KindOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }
}

/// First non-empty string value among `keys`.
///
/// Runtimes disagree on field casing (`ID` vs `Id`), so callers pass every
/// spelling they accept.
pub fn field(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
