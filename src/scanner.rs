//! Inventory pass: classify, filter and size each requested resource kind.

use crate::classify::{cache_reclaimable, classify};
use crate::error::Result;
use crate::resource::{field, ResourceKind, ResourceSummary, ScanResult};
use crate::runtime::Runtime;
use crate::select::SizeSelection;
use crate::size::parse_size;
use crate::time::AgeFilter;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Options controlling a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Kinds to scan, in output order.
    pub kinds: Vec<ResourceKind>,
    /// Include every unused image rather than only dangling ones.
    pub all_images: bool,
    pub older_than: Option<Duration>,
    pub selection: SizeSelection,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            kinds: ResourceKind::ALL.to_vec(),
            all_images: false,
            older_than: None,
            selection: SizeSelection::All,
        }
    }
}

pub struct Scanner<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    now: DateTime<Utc>,
}

impl<'a, R: Runtime + ?Sized> Scanner<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Scanner {
            runtime,
            now: Utc::now(),
        }
    }

    /// Evaluate age thresholds against a fixed clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn scan(&self, options: &ScanOptions) -> Result<ScanResult> {
        let age_filter = AgeFilter::new(options.older_than, self.now);
        let mut summaries = Vec::with_capacity(options.kinds.len());

        for &kind in &options.kinds {
            let summary = self.scan_kind(kind, options, &age_filter)?;
            tracing::info!(
                "{}: {} items, {} bytes reclaimable",
                summary.label,
                summary.items.len(),
                summary.reclaimable_bytes
            );
            summaries.push(summary);
        }

        let mut total_reclaimable_bytes: u64 =
            summaries.iter().map(|s| s.reclaimable_bytes).sum();

        if total_reclaimable_bytes == 0 {
            total_reclaimable_bytes = self.disk_usage_reclaimable();
        }

        Ok(ScanResult {
            summaries,
            total_reclaimable_bytes,
        })
    }

    fn scan_kind(
        &self,
        kind: ResourceKind,
        options: &ScanOptions,
        age_filter: &AgeFilter,
    ) -> Result<ResourceSummary> {
        let label = kind.label(options.all_images);

        let records = match kind {
            ResourceKind::Containers => self.runtime.list_containers()?,
            ResourceKind::Images => self.runtime.list_images()?,
            ResourceKind::Volumes => self.runtime.list_volumes()?,
            ResourceKind::Networks => self.runtime.list_networks()?,
            ResourceKind::Cache => {
                let mut summary = ResourceSummary::new(kind, label, Vec::new());
                summary.reclaimable_bytes = self.estimate_cache();
                return Ok(summary);
            }
        };

        let classified = classify(kind, &records, options.all_images);
        tracing::debug!(
            "{}: {} of {} records unused",
            kind,
            classified.len(),
            records.len()
        );

        let aged = age_filter.apply(classified);
        // volumes and networks carry no size to rank by
        let selected = if matches!(kind, ResourceKind::Containers | ResourceKind::Images) {
            options.selection.apply(aged)
        } else {
            aged
        };
        Ok(ResourceSummary::new(kind, label, selected))
    }

    /// Reclaimable build cache bytes.
    ///
    /// Without a dry-run capability the estimate comes from a real prune,
    /// so the cache is already reclaimed by the time this returns.
    fn estimate_cache(&self) -> u64 {
        let output = match self.runtime.preview_cache_prune() {
            Ok(Some(preview)) => preview,
            Ok(None) => {
                tracing::warn!("Build cache dry-run unsupported, pruning to measure it");
                match self.runtime.prune(ResourceKind::Cache, None, false) {
                    Ok(output) => output,
                    Err(err) => {
                        tracing::warn!("Build cache prune failed: {}", err);
                        return 0;
                    }
                }
            }
            Err(err) => {
                tracing::warn!("Build cache preview failed: {}", err);
                return 0;
            }
        };
        cache_reclaimable(&output)
    }

    /// Sum of the `Reclaimable` column of the disk usage summary.
    fn disk_usage_reclaimable(&self) -> u64 {
        match self.runtime.disk_usage() {
            Ok(rows) => {
                let total = rows
                    .iter()
                    .filter_map(|row| field(row, &["Reclaimable", "reclaimable"]))
                    .map(|value| parse_size(&value))
                    .sum();
                tracing::debug!("No per-item sizes, disk usage reports {} bytes", total);
                total
            }
            Err(err) => {
                tracing::warn!("Disk usage summary unavailable: {}", err);
                0
            }
        }
    }
}
