//! Size-based narrowing of scan results.

use crate::error::{Error, Result};
use crate::resource::ResourceItem;

/// How to narrow a set of items by size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeSelection {
    /// Keep every item, in input order.
    #[default]
    All,
    /// The N largest items.
    Top(usize),
    /// Largest items first until their combined size reaches the budget.
    Limit(u64),
}

impl SizeSelection {
    /// Build a selection from the two mutually exclusive options.
    pub fn from_options(top: Option<usize>, limit: Option<u64>) -> Result<Self> {
        match (top, limit) {
            (Some(_), Some(_)) => Err(Error::invalid(
                "--top and --limit cannot be used together",
            )),
            (Some(0), None) => Err(Error::invalid("--top must be a positive integer")),
            (Some(n), None) => Ok(SizeSelection::Top(n)),
            (None, Some(0)) => Err(Error::invalid("--limit must be greater than zero")),
            (None, Some(bytes)) => Ok(SizeSelection::Limit(bytes)),
            (None, None) => Ok(SizeSelection::All),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, SizeSelection::All)
    }

    pub fn apply(&self, items: Vec<ResourceItem>) -> Vec<ResourceItem> {
        match *self {
            SizeSelection::All => items,
            SizeSelection::Top(n) => {
                let mut sorted = sort_by_size_desc(items);
                sorted.truncate(n);
                sorted
            }
            SizeSelection::Limit(limit) => {
                let mut selected = Vec::new();
                let mut running = 0u64;
                for item in sort_by_size_desc(items) {
                    running = running.saturating_add(item.size_bytes());
                    selected.push(item);
                    if running >= limit {
                        break;
                    }
                }
                selected
            }
        }
    }
}

/// Largest first. Equal sizes keep their input order.
fn sort_by_size_desc(mut items: Vec<ResourceItem>) -> Vec<ResourceItem> {
    items.sort_by_key(|item| std::cmp::Reverse(item.size_bytes()));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, size: &str) -> ResourceItem {
        ResourceItem {
            id: id.to_string(),
            name: id.to_string(),
            size: Some(size.to_string()),
            ..ResourceItem::default()
        }
    }

    fn ids(items: &[ResourceItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    fn sample() -> Vec<ResourceItem> {
        vec![
            item("small", "100MB"),
            item("large", "500MB"),
            item("medium", "300MB"),
        ]
    }

    // ============ option validation tests ============

    #[test]
    fn test_from_options_rejects_both() {
        let err = SizeSelection::from_options(Some(2), Some(1_000)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("cannot be used together"));
    }

    #[test]
    fn test_from_options_rejects_zero() {
        assert!(SizeSelection::from_options(Some(0), None).is_err());
        assert!(SizeSelection::from_options(None, Some(0)).is_err());
    }

    #[test]
    fn test_from_options_variants() {
        assert_eq!(
            SizeSelection::from_options(None, None).unwrap(),
            SizeSelection::All
        );
        assert_eq!(
            SizeSelection::from_options(Some(3), None).unwrap(),
            SizeSelection::Top(3)
        );
        assert_eq!(
            SizeSelection::from_options(None, Some(10)).unwrap(),
            SizeSelection::Limit(10)
        );
    }

    // ============ apply tests ============

    #[test]
    fn test_all_keeps_input_order() {
        let selected = SizeSelection::All.apply(sample());
        assert_eq!(ids(&selected), vec!["small", "large", "medium"]);
    }

    #[test]
    fn test_top_n_picks_largest() {
        let selected = SizeSelection::Top(2).apply(sample());
        assert_eq!(ids(&selected), vec!["large", "medium"]);
    }

    #[test]
    fn test_top_n_larger_than_input() {
        let selected = SizeSelection::Top(10).apply(sample());
        assert_eq!(ids(&selected), vec!["large", "medium", "small"]);
    }

    #[test]
    fn test_top_n_excluded_items_are_not_larger() {
        let items = vec![
            item("a", "1GB"),
            item("b", "20MB"),
            item("c", "3GB"),
            item("d", "700MB"),
            item("e", "2GB"),
        ];
        let selected = SizeSelection::Top(3).apply(items.clone());
        let smallest_kept = selected.iter().map(|i| i.size_bytes()).min().unwrap();
        for excluded in items.iter().filter(|i| !selected.contains(i)) {
            assert!(excluded.size_bytes() <= smallest_kept);
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let items = vec![item("first", "1GB"), item("second", "1GB"), item("third", "1GB")];
        let selected = SizeSelection::Top(2).apply(items);
        assert_eq!(ids(&selected), vec!["first", "second"]);
    }

    #[test]
    fn test_limit_includes_crossing_item() {
        let selected = SizeSelection::Limit(600_000_000).apply(sample());
        assert_eq!(ids(&selected), vec!["large", "medium"]);
    }

    #[test]
    fn test_limit_stops_on_exact_match() {
        let selected = SizeSelection::Limit(500_000_000).apply(sample());
        assert_eq!(ids(&selected), vec!["large"]);
    }

    #[test]
    fn test_limit_above_total_returns_all() {
        let selected = SizeSelection::Limit(5_000_000_000).apply(sample());
        assert_eq!(ids(&selected), vec!["large", "medium", "small"]);
    }

    #[test]
    fn test_sizeless_items_sort_last() {
        let volume = ResourceItem {
            id: "volume".into(),
            ..ResourceItem::default()
        };
        let mut items = sample();
        items.insert(0, volume);
        let selected = SizeSelection::Top(4).apply(items);
        assert_eq!(ids(&selected).last(), Some(&"volume"));
    }
}
