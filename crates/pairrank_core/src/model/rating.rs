//! Per-item rating state.

use super::item::Item;
use serde::{Deserialize, Serialize};

/// Elo-style strength estimate and comparison count for one item.
///
/// # Invariants
/// - `comparisons` never decreases.
/// - `strength` is unbounded; no clamping is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub strength: f64,
    pub comparisons: u32,
}

impl Rating {
    /// Rating assigned to a newly created item.
    pub fn baseline(strength: f64) -> Self {
        Self {
            strength,
            comparisons: 0,
        }
    }
}

/// Item joined with its current rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedItem {
    pub item: Item,
    pub rating: Rating,
}
