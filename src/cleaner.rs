//! Cleanup pass: bulk prune or explicit removal, one kind at a time.
//!
//! A failure in one kind is recorded against that kind and the remaining
//! kinds still run. Nothing is retried.

use crate::classify::cache_reclaimable;
use crate::error::Result;
use crate::resource::{CleanResult, KindOutcome, ResourceKind, ScanResult};
use crate::runtime::Runtime;
use crate::size::parse_size;
use crate::time::cutoff_for;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Identifiers and scan-time size estimates captured when size selection
/// narrowed the scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanTargets {
    pub ids: HashMap<ResourceKind, Vec<String>>,
    pub estimates: HashMap<ResourceKind, u64>,
}

impl CleanTargets {
    pub fn from_scan(scan: &ScanResult) -> Self {
        let mut targets = CleanTargets::default();
        for summary in &scan.summaries {
            targets.ids.insert(summary.kind, summary.ids());
            targets
                .estimates
                .insert(summary.kind, summary.reclaimable_bytes);
        }
        targets
    }
}

/// How the selected resources get deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStrategy {
    /// The runtime's prune for each kind, with the age cutoff.
    Prune,
    /// Explicit removal of the identifiers selected during the scan.
    /// The build cache has no identifiers and is always pruned.
    ByIdentifier(CleanTargets),
}

/// Options controlling a cleanup pass
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub kinds: Vec<ResourceKind>,
    pub older_than: Option<Duration>,
    pub dry_run: bool,
    pub all_images: bool,
    /// Item counts from the scan, used when prune output has no count.
    pub expected: HashMap<ResourceKind, usize>,
    pub strategy: CleanupStrategy,
}

impl CleanOptions {
    /// Options for cleaning up exactly what `scan` found.
    ///
    /// Identifier removal is used only when size selection narrowed the scan.
    pub fn from_scan(
        scan: &ScanResult,
        older_than: Option<Duration>,
        all_images: bool,
        selection_active: bool,
    ) -> Self {
        let strategy = if selection_active {
            CleanupStrategy::ByIdentifier(CleanTargets::from_scan(scan))
        } else {
            CleanupStrategy::Prune
        };
        CleanOptions {
            kinds: scan.summaries.iter().map(|s| s.kind).collect(),
            older_than,
            dry_run: false,
            all_images,
            expected: scan
                .summaries
                .iter()
                .map(|s| (s.kind, s.items.len()))
                .collect(),
            strategy,
        }
    }
}

pub struct Cleaner<'a, R: Runtime + ?Sized> {
    runtime: &'a R,
    now: DateTime<Utc>,
}

impl<'a, R: Runtime + ?Sized> Cleaner<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Cleaner {
            runtime,
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn clean(&self, options: &CleanOptions) -> CleanResult {
        if options.dry_run {
            tracing::info!("Dry run: no resources removed");
            return CleanResult {
                outcomes: options
                    .kinds
                    .iter()
                    .map(|&kind| KindOutcome {
                        kind,
                        removed: 0,
                        failures: Vec::new(),
                    })
                    .collect(),
                reclaimed_bytes: 0,
            };
        }

        let until = options.older_than.map(|age| cutoff_for(age, self.now));
        let mut result = CleanResult::default();

        for &kind in &options.kinds {
            let attempt = match &options.strategy {
                CleanupStrategy::ByIdentifier(targets) if kind.is_addressable() => {
                    self.remove_ids(kind, targets)
                }
                _ => self.prune(kind, until, options),
            };

            let outcome = match attempt {
                Ok((removed, bytes)) => {
                    result.reclaimed_bytes = result.reclaimed_bytes.saturating_add(bytes);
                    KindOutcome {
                        kind,
                        removed,
                        failures: Vec::new(),
                    }
                }
                Err(err) => {
                    tracing::warn!("Cleaning {} failed: {}", kind, err);
                    KindOutcome {
                        kind,
                        removed: 0,
                        failures: vec![err.to_string()],
                    }
                }
            };
            result.outcomes.push(outcome);
        }

        result
    }

    /// Returns the removed count and reclaimed bytes.
    fn prune(
        &self,
        kind: ResourceKind,
        until: Option<DateTime<Utc>>,
        options: &CleanOptions,
    ) -> Result<(usize, u64)> {
        let output = self.runtime.prune(kind, until, options.all_images)?;
        let expected = options.expected.get(&kind).copied().unwrap_or(0);
        let removed = deleted_count(&output).unwrap_or_else(|| {
            tracing::debug!(
                "No deleted count in {} prune output, using scan count {}",
                kind,
                expected
            );
            expected
        });
        let bytes = match kind {
            ResourceKind::Cache => cache_reclaimable(&output),
            _ => reclaimed_space(&output),
        };
        Ok((removed, bytes))
    }

    fn remove_ids(&self, kind: ResourceKind, targets: &CleanTargets) -> Result<(usize, u64)> {
        let ids = targets.ids.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        if ids.is_empty() {
            return Ok((0, 0));
        }
        self.runtime.remove(kind, ids)?;
        let bytes = targets.estimates.get(&kind).copied().unwrap_or(0);
        Ok((ids.len(), bytes))
    }
}

fn deleted_count_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)Deleted\s+[a-z ]+:[ \t]*(\d+)[ \t]*$").expect("valid deleted count regex")
    })
}

fn reclaimed_space_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)Total reclaimed space:\s*([^\r\n]+)").expect("valid reclaimed regex")
    })
}

/// `Deleted Containers: 3` → `Some(3)`.
pub fn deleted_count(output: &str) -> Option<usize> {
    deleted_count_pattern()
        .captures(output)
        .and_then(|caps| caps[1].parse().ok())
}

/// `Total reclaimed space: 1.2GB` → bytes, `0` if absent.
pub fn reclaimed_space(output: &str) -> u64 {
    reclaimed_space_pattern()
        .captures(output)
        .map(|caps| parse_size(&caps[1]))
        .unwrap_or(0)
}
