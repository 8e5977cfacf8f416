//! Age thresholds and runtime timestamp parsing.

use crate::error::{Error, Result};
use crate::resource::ResourceItem;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::time::Duration;

/// Narrows items by creation time relative to a cutoff of `now - threshold`.
///
/// An item is kept when its creation time parses and is at or after the
/// cutoff. Items without a usable timestamp are dropped whenever a threshold
/// is set, since their age cannot be established.
#[derive(Debug, Clone, Copy)]
pub struct AgeFilter {
    cutoff: Option<DateTime<Utc>>,
}

impl AgeFilter {
    pub fn new(threshold: Option<Duration>, now: DateTime<Utc>) -> Self {
        AgeFilter {
            cutoff: threshold.map(|threshold| cutoff_for(threshold, now)),
        }
    }

    /// A filter that keeps everything.
    pub fn inactive() -> Self {
        AgeFilter { cutoff: None }
    }

    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.cutoff
    }

    pub fn is_active(&self) -> bool {
        self.cutoff.is_some()
    }

    /// Check whether an item with this creation timestamp survives the filter
    pub fn retains(&self, created_at: Option<&str>) -> bool {
        let Some(cutoff) = self.cutoff else {
            return true;
        };
        match created_at.and_then(parse_timestamp) {
            Some(created) => created >= cutoff,
            None => false,
        }
    }

    pub fn apply(&self, items: Vec<ResourceItem>) -> Vec<ResourceItem> {
        if !self.is_active() {
            return items;
        }
        let before = items.len();
        let kept: Vec<ResourceItem> = items
            .into_iter()
            .filter(|item| self.retains(item.created_at.as_deref()))
            .collect();
        tracing::debug!(
            "Age filter kept {} of {} items (cutoff {:?})",
            kept.len(),
            before,
            self.cutoff
        );
        kept
    }
}

/// `now - threshold`, saturating at the earliest representable time.
pub fn cutoff_for(threshold: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    chrono::Duration::from_std(threshold)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse a timestamp as printed by the runtime.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:00Z`) and the display format
/// `2024-01-15 10:30:00 +0000 UTC`, with optional fractional seconds.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    // "2024-01-15 10:30:00 +0000 UTC": drop the trailing zone abbreviation
    let mut parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() == 4 && parts[3].chars().all(|c| c.is_ascii_alphabetic()) {
        parts.pop();
    }
    let normalized = parts.join(" ");

    if let Ok(parsed) =
        DateTime::<FixedOffset>::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f %z")
    {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a duration string with optional unit suffix
/// Supports: h (hours), d (days), w (weeks), m (months)
/// Plain numbers default to days
/// Examples: "15", "15d", "2w", "3m", "48h"
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let duration_str = duration_str.trim();

    let (num_str, unit) = if let Some(pos) = duration_str.find(|c: char| c.is_alphabetic()) {
        let (num, unit) = duration_str.split_at(pos);
        (num, Some(unit))
    } else {
        (duration_str, None)
    };

    let value: u64 = num_str.trim().parse().map_err(|_| {
        Error::invalid(format!(
            "Invalid duration format. Expected a number, got: {}",
            num_str
        ))
    })?;

    let unit_seconds: u64 = match unit {
        None | Some("d") | Some("D") => 24 * 60 * 60,
        Some("h") | Some("H") => 60 * 60,
        Some("w") | Some("W") => 7 * 24 * 60 * 60,
        // Months are approximated as 30 days
        Some("m") | Some("M") => 30 * 24 * 60 * 60,
        Some(unknown) => {
            return Err(Error::invalid(format!(
                "Invalid duration unit '{}'. Supported units: h (hours), d (days), w (weeks), m (months)",
                unknown
            )));
        }
    };

    let seconds = value
        .checked_mul(unit_seconds)
        .ok_or_else(|| Error::invalid(format!("Duration too large: {}", duration_str)))?;

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DAY: u64 = 24 * 60 * 60;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn item_created(created_at: Option<&str>) -> ResourceItem {
        ResourceItem {
            id: "abc".to_string(),
            name: "thing".to_string(),
            created_at: created_at.map(str::to_string),
            ..ResourceItem::default()
        }
    }

    // ============ parse_duration tests ============

    #[test]
    fn test_parse_duration_default_days() {
        let duration = parse_duration("15").unwrap();
        assert_eq!(duration.as_secs(), 15 * DAY);
    }

    #[test]
    fn test_parse_duration_explicit_days() {
        assert_eq!(parse_duration("15d").unwrap().as_secs(), 15 * DAY);
        assert_eq!(parse_duration("15D").unwrap().as_secs(), 15 * DAY);
    }

    #[test]
    fn test_parse_duration_hours() {
        assert_eq!(parse_duration("48h").unwrap().as_secs(), 48 * 60 * 60);
    }

    #[test]
    fn test_parse_duration_weeks() {
        assert_eq!(parse_duration("2w").unwrap().as_secs(), 14 * DAY);
    }

    #[test]
    fn test_parse_duration_months() {
        assert_eq!(parse_duration("3M").unwrap().as_secs(), 90 * DAY);
    }

    #[test]
    fn test_parse_duration_invalid_unit() {
        let result = parse_duration("15x");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid duration unit"));
    }

    #[test]
    fn test_parse_duration_invalid_number() {
        let result = parse_duration("abc");
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert!(parse_duration("18446744073709551615w").is_err());
    }

    #[test]
    fn test_parse_duration_with_whitespace() {
        assert_eq!(parse_duration("  15d  ").unwrap().as_secs(), 15 * DAY);
    }

    // ============ parse_timestamp tests ============

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let parsed = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_runtime_display_format() {
        let parsed = parse_timestamp("2024-01-15 10:30:00 +0000 UTC").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_with_offset_and_fraction() {
        let parsed = parse_timestamp("2024-01-15 12:30:00.123456789 +0200 CEST").unwrap();
        assert_eq!(
            parsed.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn test_parse_timestamp_naive_is_utc() {
        let parsed = parse_timestamp("2024-01-15 10:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("3 days ago").is_none());
    }

    // ============ AgeFilter tests ============

    #[test]
    fn test_age_filter_inactive_keeps_everything() {
        let filter = AgeFilter::new(None, now());
        assert!(!filter.is_active());
        let items = vec![item_created(None), item_created(Some("garbage"))];
        assert_eq!(filter.apply(items).len(), 2);
    }

    #[test]
    fn test_age_filter_cutoff() {
        let filter = AgeFilter::new(Some(Duration::from_secs(7 * DAY)), now());
        assert_eq!(
            filter.cutoff(),
            Some(Utc.with_ymd_and_hms(2025, 5, 25, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_age_filter_keeps_items_at_or_after_cutoff() {
        let filter = AgeFilter::new(Some(Duration::from_secs(7 * DAY)), now());
        assert!(filter.retains(Some("2025-05-30T00:00:00Z")));
        assert!(filter.retains(Some("2025-05-25T12:00:00Z")));
        assert!(!filter.retains(Some("2025-05-01T00:00:00Z")));
    }

    #[test]
    fn test_age_filter_drops_unprovable_age() {
        let filter = AgeFilter::new(Some(Duration::from_secs(DAY)), now());
        let items = vec![
            item_created(None),
            item_created(Some("not a date")),
            item_created(Some("2025-06-01 11:00:00 +0000 UTC")),
        ];
        let kept = filter.apply(items);
        assert_eq!(kept.len(), 1);
        assert_eq!(
            kept[0].created_at.as_deref(),
            Some("2025-06-01 11:00:00 +0000 UTC")
        );
    }

    #[test]
    fn test_cutoff_saturates() {
        let cutoff = cutoff_for(Duration::from_secs(u64::MAX), now());
        assert_eq!(cutoff, DateTime::<Utc>::MIN_UTC);
    }
}
