//! Outcomes of a seed invocation.
//!
//! Every child record yields exactly one [`RowOutcome`]; the [`SeedReport`] is a
//! reduction over those values. Record-level failures are data here, never errors.

use crate::family::FamilyKind;
use crate::stats::average_rating;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on the number of outcomes echoed back in a report.
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedOptions {
    /// Wipe relation, child and parent rows (in that order) before seeding.
    #[serde(default = "default_clear_existing")]
    pub clear_existing: bool,
}

fn default_clear_existing() -> bool {
    true
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self { clear_existing: true }
    }
}

/// The result of seeding a single child record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowOutcome {
    #[serde(rename = "success")]
    Inserted {
        id: i32,
        title: String,
        rating: Option<i32>,
        parents: Vec<String>,
        /// Declared parent names that had no identifier in this invocation.
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        unresolved: Vec<String>,
    },
    #[serde(rename = "error")]
    Failed { title: String, error: String },
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RowOutcome::Inserted { .. })
    }

    pub fn title(&self) -> &str {
        match self {
            RowOutcome::Inserted { title, .. } | RowOutcome::Failed { title, .. } => title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedReport {
    pub family: FamilyKind,
    pub cleared: bool,
    pub parents_processed: usize,
    pub parent_ids: BTreeMap<String, i32>,
    pub children_total: usize,
    pub children_succeeded: usize,
    pub children_failed: usize,
    pub average_rating: Option<f64>,
    /// The first few outcomes, in insertion order.
    pub sample: Vec<RowOutcome>,
    /// Every failed outcome, including those past the sample.
    pub failures: Vec<RowOutcome>,
}

impl SeedReport {
    /// Reduces per-record outcomes into the aggregate report.
    pub fn tally(
        family: FamilyKind,
        cleared: bool,
        parent_ids: BTreeMap<String, i32>,
        outcomes: Vec<RowOutcome>,
        sample_limit: usize,
    ) -> Self {
        let children_total = outcomes.len();
        let children_succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let ratings: Vec<i32> = outcomes
            .iter()
            .filter_map(|o| match o {
                RowOutcome::Inserted { rating, .. } => *rating,
                RowOutcome::Failed { .. } => None,
            })
            .collect();

        let failures: Vec<RowOutcome> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .cloned()
            .collect();
        let mut sample = outcomes;
        sample.truncate(sample_limit);

        Self {
            family,
            cleared,
            parents_processed: parent_ids.len(),
            parent_ids,
            children_total,
            children_succeeded,
            children_failed: children_total - children_succeeded,
            average_rating: average_rating(&ratings),
            sample,
            failures,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.failures.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inserted(id: i32, title: &str, rating: i32) -> RowOutcome {
        RowOutcome::Inserted {
            id,
            title: title.to_string(),
            rating: Some(rating),
            parents: vec!["Forest Dwellers".to_string()],
            unresolved: Vec::new(),
        }
    }

    #[test]
    fn one_failure_in_a_batch_is_counted_not_fatal() {
        let outcomes = vec![
            inserted(1, "Panda", 10),
            inserted(2, "Dolphin", 9),
            RowOutcome::Failed {
                title: "Ghost".to_string(),
                error: "violates check constraint".to_string(),
            },
            inserted(3, "Penguin", 10),
            inserted(4, "Monkey", 8),
            inserted(5, "Duckling", 9),
        ];
        let parents = BTreeMap::from([("Forest Dwellers".to_string(), 7)]);

        let report = SeedReport::tally(FamilyKind::Categories, true, parents, outcomes, 10);

        assert_eq!(report.children_total, 6);
        assert_eq!(report.children_succeeded, 5);
        assert_eq!(report.children_failed, 1);
        assert_eq!(report.parents_processed, 1);
        assert_eq!(report.average_rating, Some(9.2));
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn sample_is_truncated() {
        let outcomes = (0..25).map(|i| inserted(i, "x", 5)).collect();
        let report = SeedReport::tally(FamilyKind::Tags, false, BTreeMap::new(), outcomes, 10);
        assert_eq!(report.sample.len(), 10);
        assert_eq!(report.children_succeeded, 25);
    }

    #[test]
    fn failures_past_the_sample_stay_visible() {
        let outcomes = (0..25)
            .map(|i| {
                if i == 15 {
                    RowOutcome::Failed {
                        title: "Ghost".to_string(),
                        error: "violates check constraint".to_string(),
                    }
                } else {
                    inserted(i, "x", 5)
                }
            })
            .collect();
        let report = SeedReport::tally(FamilyKind::Tags, true, BTreeMap::new(), outcomes, 10);

        assert_eq!(report.sample.len(), 10);
        assert!(report.sample.iter().all(RowOutcome::is_success));
        assert_eq!(report.children_failed, 1);
        assert_eq!(report.failures().count(), report.children_failed);
        let failed: Vec<&str> = report.failures().map(RowOutcome::title).collect();
        assert_eq!(failed, vec!["Ghost"]);
    }

    #[test]
    fn options_default_to_clearing() {
        let parsed: SeedOptions = serde_json::from_str("{}").unwrap();
        assert!(parsed.clear_existing);
        let parsed: SeedOptions = serde_json::from_str(r#"{"clearExisting": false}"#).unwrap();
        assert!(!parsed.clear_existing);
    }

    #[test]
    fn outcomes_serialize_with_status_tag() {
        let json = serde_json::to_value(RowOutcome::Failed {
            title: "Ghost".to_string(),
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["title"], "Ghost");
    }
}
