//! Pool sampler: picks the next two items to compare.
//!
//! 1. Keep at most `pool_size` candidates, least-compared first.
//! 2. Pick the focus uniformly from the first `focus_size` of them.
//! 3. Pair it with the pool item whose strength is closest to the focus.
//!
//! Near-equal strengths carry the most information per vote, and the focus
//! window keeps under-sampled items flowing into comparisons.

use crate::model::rating::RatedItem;
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fewer than two active items were available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientItems {
    pub available: usize,
}

impl Display for InsufficientItems {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "at least 2 active items are required to sample a pair, found {}",
            self.available
        )
    }
}

impl Error for InsufficientItems {}

/// Selected comparison. `focus` is shown on the left, `opponent` on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPair {
    pub focus: RatedItem,
    pub opponent: RatedItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSampler {
    pool_size: usize,
    focus_size: usize,
}

impl PoolSampler {
    /// Window sizes below their minimum (2 and 1) are raised to it.
    pub fn new(pool_size: usize, focus_size: usize) -> Self {
        Self {
            pool_size: pool_size.max(2),
            focus_size: focus_size.max(1),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Selects `(focus, opponent)` from the active items of one list.
    ///
    /// `candidates` may arrive in any order; the pool is rebuilt by a stable
    /// sort on comparison count, so storage order breaks ties.
    pub fn sample<R: Rng>(
        &self,
        mut candidates: Vec<RatedItem>,
        rng: &mut R,
    ) -> Result<SampledPair, InsufficientItems> {
        candidates.sort_by_key(|candidate| candidate.rating.comparisons);
        candidates.truncate(self.pool_size);
        let pool = candidates;

        if pool.len() < 2 {
            return Err(InsufficientItems {
                available: pool.len(),
            });
        }

        let window = self.focus_size.min(pool.len());
        let focus_index = rng.random_range(0..window);
        let opponent_index = closest_opponent(&pool, focus_index).ok_or(InsufficientItems {
            available: pool.len(),
        })?;

        Ok(SampledPair {
            focus: pool[focus_index].clone(),
            opponent: pool[opponent_index].clone(),
        })
    }
}

/// Index of the pool entry nearest in strength to `pool[focus_index]`.
///
/// Equidistant candidates resolve to the earliest pool position.
fn closest_opponent(pool: &[RatedItem], focus_index: usize) -> Option<usize> {
    let focus_strength = pool[focus_index].rating.strength;
    let distance = |candidate: &RatedItem| (candidate.rating.strength - focus_strength).abs();

    pool.iter()
        .enumerate()
        .filter(|(index, _)| *index != focus_index)
        .min_by(|(_, a), (_, b)| distance(a).total_cmp(&distance(b)))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::{closest_opponent, InsufficientItems, PoolSampler};
    use crate::model::item::Item;
    use crate::model::rating::{RatedItem, Rating};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn rated(strength: f64, comparisons: u32) -> RatedItem {
        RatedItem {
            item: Item::new(Uuid::nil(), "text", json!(strength)),
            rating: Rating {
                strength,
                comparisons,
            },
        }
    }

    #[test]
    fn fewer_than_two_candidates_fail() {
        let sampler = PoolSampler::new(200, 30);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            sampler.sample(Vec::new(), &mut rng),
            Err(InsufficientItems { available: 0 })
        );
        assert_eq!(
            sampler.sample(vec![rated(1500.0, 0)], &mut rng),
            Err(InsufficientItems { available: 1 })
        );
    }

    #[test]
    fn two_candidates_are_always_paired_with_each_other() {
        let sampler = PoolSampler::new(200, 30);
        let a = rated(1500.0, 0);
        let b = rated(1700.0, 4);
        let ids: HashSet<Uuid> = [a.item.id, b.item.id].into_iter().collect();

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pair = sampler.sample(vec![a.clone(), b.clone()], &mut rng).unwrap();
            assert_ne!(pair.focus.item.id, pair.opponent.item.id);
            let got: HashSet<Uuid> = [pair.focus.item.id, pair.opponent.item.id]
                .into_iter()
                .collect();
            assert_eq!(got, ids);
        }
    }

    #[test]
    fn focus_comes_from_least_compared_window() {
        let sampler = PoolSampler::new(6, 2);
        let candidates = vec![
            rated(1500.0, 9),
            rated(1510.0, 0),
            rated(1490.0, 8),
            rated(1520.0, 1),
            rated(1480.0, 7),
            rated(1530.0, 6),
        ];
        let window: HashSet<Uuid> = [candidates[1].item.id, candidates[3].item.id]
            .into_iter()
            .collect();

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pair = sampler.sample(candidates.clone(), &mut rng).unwrap();
            assert!(window.contains(&pair.focus.item.id));
            assert_ne!(pair.focus.item.id, pair.opponent.item.id);
        }
    }

    #[test]
    fn pool_excludes_most_compared_items() {
        let sampler = PoolSampler::new(3, 3);
        let heavy = rated(1500.0, 50);
        let candidates = vec![
            heavy.clone(),
            rated(1000.0, 0),
            rated(2000.0, 1),
            rated(3000.0, 2),
        ];

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pair = sampler.sample(candidates.clone(), &mut rng).unwrap();
            assert_ne!(pair.focus.item.id, heavy.item.id);
            assert_ne!(pair.opponent.item.id, heavy.item.id);
        }
    }

    #[test]
    fn opponent_is_closest_in_strength() {
        let pool = vec![
            rated(1500.0, 0),
            rated(1800.0, 0),
            rated(1540.0, 0),
            rated(1470.0, 0),
        ];
        assert_eq!(closest_opponent(&pool, 0), Some(3));
        assert_eq!(closest_opponent(&pool, 1), Some(2));
    }

    #[test]
    fn equidistant_opponents_resolve_to_pool_order() {
        let pool = vec![
            rated(1600.0, 0),
            rated(1500.0, 0),
            rated(1400.0, 0),
            rated(1600.0, 0),
        ];
        // indexes 0, 2 and 3 are all 100 away from the focus
        assert_eq!(closest_opponent(&pool, 1), Some(0));

        let tied = vec![rated(1500.0, 0), rated(1500.0, 0), rated(1500.0, 0)];
        assert_eq!(closest_opponent(&tied, 0), Some(1));
        assert_eq!(closest_opponent(&tied, 2), Some(0));
    }

    #[test]
    fn focus_window_is_clipped_to_pool() {
        let sampler = PoolSampler::new(200, 30);
        let candidates = vec![rated(1500.0, 0), rated(1500.0, 0), rated(1500.0, 0)];
        let mut seen = HashSet::new();

        for seed in 0..256 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pair = sampler.sample(candidates.clone(), &mut rng).unwrap();
            seen.insert(pair.focus.item.id);
        }
        assert_eq!(seen.len(), 3);
    }
}
