//! Pairwise ranking engine.
//!
//! # Responsibility
//! - `elo`: win probability and the rating update rule.
//! - `sampler`: choose the next two items to compare.
//! - `ledger`: issue pairs and resolve votes exactly once.
//! - `stability`: convergence score over the current ranking.
//!
//! # Invariants
//! - `elo`, `sampler` and `stability` are pure; only `ledger` touches storage.

pub mod elo;
pub mod ledger;
pub mod sampler;
pub mod stability;
