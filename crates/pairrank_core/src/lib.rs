//! Core pairwise ranking engine for PairRank.
//! This crate is the single source of truth for ranking invariants.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, RankingConfig};
pub use engine::elo::win_probability;
pub use engine::ledger::{IgnoredReason, VoteOutcome};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{Item, ItemId, ItemPatch, ListId, RankList};
pub use model::pair::{Pair, PairId, PairState, Side, Verdict};
pub use model::rating::{RatedItem, Rating};
pub use repo::ranking_repo::{
    ItemOrder, RankingRepository, RecordRef, RepoError, RepoResult, SqliteRankingRepository,
};
pub use service::ranking_service::{
    IssuedPair, ListStatus, RankingError, RankingResult, RankingService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
