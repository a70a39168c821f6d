use serde::{Deserialize, Serialize};

/// Aggregate rollup over one family's seeded data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_parents: i64,
    pub total_children: i64,
    /// Rounded to one decimal place; `None` when no child carries a rating.
    pub average_rating: Option<f64>,
    pub max_rating: Option<i32>,
}

/// Rounds half away from zero to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Averages a set of ratings, rounded to one decimal place.
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    Some(round_to_tenth(sum as f64 / ratings.len() as f64))
}
