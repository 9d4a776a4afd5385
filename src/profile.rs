use std::cmp::Reverse;
use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::models::{HistoryEntry, LegacyTestRecord, TestResult};

pub const RECENT_LIMIT: usize = 5;

/// Merges both stored histories into the profile page's recent-tests list,
/// newest first.
///
/// Canonical entries get their category re-derived from the catalog's
/// ranges; results for tests the catalog no longer knows keep whatever was
/// stored. Legacy entries keep their own category and max score; a legacy
/// entry written alongside a canonical one (same id as the canonical
/// timestamp in milliseconds) is shown only once. Entries without a usable
/// date sort last.
pub fn recent_history(
    catalog: &Catalog,
    results: &[TestResult],
    legacy: &[LegacyTestRecord],
    limit: usize,
) -> Vec<HistoryEntry> {
    let mirrored: HashSet<i64> = results
        .iter()
        .map(|r| r.timestamp.timestamp_millis())
        .collect();

    let mut entries: Vec<HistoryEntry> = legacy
        .iter()
        .filter(|record| !mirrored.contains(&record.id))
        .map(|record| HistoryEntry {
            name: record.name.clone(),
            score: record.score,
            max_score: record.max_score,
            category: record.category.clone(),
            severity_class: None,
            taken_at: record.taken_at(),
        })
        .collect();

    entries.extend(results.iter().map(|result| {
        let (category, severity_class, max_score) = match catalog.by_test_name(&result.test_name) {
            Some(def) => {
                let range = def.categorize(result.score);
                (
                    range.category.clone(),
                    range.severity_class.clone(),
                    def.max_score,
                )
            }
            None => (
                result.category.clone(),
                result.severity_class.clone(),
                result.max_score,
            ),
        };
        HistoryEntry {
            name: result.test_name.clone(),
            score: result.score,
            max_score,
            category: Some(category),
            severity_class: Some(severity_class),
            taken_at: Some(result.timestamp),
        }
    }));

    entries.sort_by_key(|e| Reverse(e.taken_at));
    entries.truncate(limit);
    entries
}
