//! Convergence score for a ranking.
//!
//! Stability is the mean, over every adjacent pair of the strength-sorted
//! ranking, of the probability that the upper item beats the lower one.
//! Values near 1.0 mean every boundary is decisive; values near 0.5 mean
//! neighbours are still indistinguishable.

use crate::engine::elo::win_probability;
use crate::model::rating::RatedItem;

/// Stability reported when there is no adjacent pair to doubt.
pub const TRIVIAL_STABILITY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StabilityReport {
    pub stability: f64,
    /// Items sorted strongest first.
    pub ranked: Vec<RatedItem>,
}

/// Sorts `items` strongest first and scores the resulting order.
///
/// The sort is stable, so equal strengths keep their incoming order.
pub fn evaluate(mut items: Vec<RatedItem>) -> StabilityReport {
    items.sort_by(|a, b| b.rating.strength.total_cmp(&a.rating.strength));

    let stability = if items.len() < 2 {
        TRIVIAL_STABILITY
    } else {
        let total: f64 = items
            .windows(2)
            .map(|pair| win_probability(pair[0].rating.strength, pair[1].rating.strength))
            .sum();
        total / (items.len() - 1) as f64
    };

    StabilityReport {
        stability,
        ranked: items,
    }
}

#[cfg(test)]
mod tests {
    use super::evaluate;
    use crate::engine::elo::win_probability;
    use crate::model::item::Item;
    use crate::model::rating::{RatedItem, Rating};
    use serde_json::json;
    use uuid::Uuid;

    fn rated(strength: f64) -> RatedItem {
        RatedItem {
            item: Item::new(Uuid::nil(), "text", json!(null)),
            rating: Rating::baseline(strength),
        }
    }

    #[test]
    fn empty_and_single_rankings_are_fully_stable() {
        assert_eq!(evaluate(Vec::new()).stability, 1.0);
        let report = evaluate(vec![rated(1234.0)]);
        assert_eq!(report.stability, 1.0);
        assert_eq!(report.ranked.len(), 1);
    }

    #[test]
    fn equal_strengths_score_one_half() {
        let report = evaluate(vec![rated(1500.0), rated(1500.0), rated(1500.0)]);
        assert_eq!(report.stability, 0.5);
    }

    #[test]
    fn ranking_is_sorted_descending_and_averaged() {
        let report = evaluate(vec![rated(1400.0), rated(1700.0), rated(1500.0)]);
        let strengths: Vec<f64> = report.ranked.iter().map(|r| r.rating.strength).collect();
        assert_eq!(strengths, vec![1700.0, 1500.0, 1400.0]);

        let expected =
            (win_probability(1700.0, 1500.0) + win_probability(1500.0, 1400.0)) / 2.0;
        assert!((report.stability - expected).abs() < 1e-12);
        assert!(report.stability > 0.5 && report.stability < 1.0);
    }

    #[test]
    fn ties_keep_incoming_order() {
        let first = rated(1500.0);
        let second = rated(1500.0);
        let report = evaluate(vec![first.clone(), second.clone()]);
        assert_eq!(report.ranked[0].item.id, first.item.id);
        assert_eq!(report.ranked[1].item.id, second.item.id);
    }
}
