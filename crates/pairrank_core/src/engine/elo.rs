//! Elo-style strength model.
//!
//! `P(a beats b) = 1 / (1 + 10^(-(a - b) / 400))`, and a resolved comparison
//! moves each participant by `k * (actual - expected)`.

use crate::model::rating::Rating;

const ELO_SCALE: f64 = 400.0;

/// Expected probability that strength `a` beats strength `b`.
///
/// Always evaluated from the favoured side, so
/// `win_probability(a, b) + win_probability(b, a) == 1.0` holds exactly.
pub fn win_probability(a: f64, b: f64) -> f64 {
    if a >= b {
        favoured_probability(a - b)
    } else {
        1.0 - favoured_probability(b - a)
    }
}

fn favoured_probability(gap: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-gap / ELO_SCALE))
}

/// Ratings of both participants after one applied vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub winner: Rating,
    pub loser: Rating,
}

/// Applies one binary outcome to both participants simultaneously.
///
/// Both new strengths derive from the pre-update values; each participant's
/// comparison count grows by exactly one.
pub fn apply_outcome(winner: Rating, loser: Rating, k_factor: f64) -> Outcome {
    let expected_winner = win_probability(winner.strength, loser.strength);
    let expected_loser = 1.0 - expected_winner;

    Outcome {
        winner: Rating {
            strength: winner.strength + k_factor * (1.0 - expected_winner),
            comparisons: winner.comparisons.saturating_add(1),
        },
        loser: Rating {
            strength: loser.strength + k_factor * (0.0 - expected_loser),
            comparisons: loser.comparisons.saturating_add(1),
        },
    }
}
