//! Ranking use-case service.
//!
//! # Responsibility
//! - Expose list/item management plus the three ranking operations:
//!   request a pair, submit a vote, read status.
//! - Translate repository and engine failures into `RankingError`.
//! - Emit metadata-only diagnostic events (ids and numbers, never payloads).
//!
//! # Invariants
//! - Every list-scoped operation checks list existence first.
//! - Benign no-op votes are `Ok(VoteOutcome::Ignored(..))`, never errors.
//! - Service layer remains storage-agnostic.

use crate::config::{ConfigError, RankingConfig};
use crate::engine::ledger::{self, LedgerError, VoteOutcome};
use crate::engine::sampler::{InsufficientItems, PoolSampler};
use crate::engine::stability;
use crate::model::item::{Item, ItemId, ItemPatch, ListId, RankList};
use crate::model::pair::{Pair, PairId};
use crate::model::rating::{RatedItem, Rating};
use crate::model::ValidationError;
use crate::repo::ranking_repo::{ItemOrder, RankingRepository, RecordRef, RepoError};
use log::{info, warn};
use rand::Rng;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RankingResult<T> = Result<T, RankingError>;

/// Service error for ranking use-cases.
#[derive(Debug)]
pub enum RankingError {
    ListNotFound(ListId),
    ItemNotFound(ItemId),
    PairNotFound(PairId),
    /// Fewer than two active items to compare.
    InsufficientItems { available: usize },
    /// Winner input named neither side. Carries the rejected input.
    InvalidWinner(String),
    /// Caller input failed validation (blank name or kind).
    InvalidInput(String),
    Config(ConfigError),
    /// Persistence-layer failure, passed through unchanged.
    Repo(RepoError),
}

impl RankingError {
    /// Stable snake_case code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ListNotFound(_) | Self::ItemNotFound(_) | Self::PairNotFound(_) => "not_found",
            Self::InsufficientItems { .. } => "insufficient_items",
            Self::InvalidWinner(_) => "invalid_winner",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) => "invalid_config",
            Self::Repo(_) => "storage_failure",
        }
    }
}

impl Display for RankingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::PairNotFound(id) => write!(f, "pair not found: {id}"),
            Self::InsufficientItems { available } => write!(
                f,
                "not enough active items: need 2, found {available}"
            ),
            Self::InvalidWinner(value) => {
                write!(f, "winner must be `left` or `right`, got `{value}`")
            }
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RankingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RankingError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(RecordRef::List(id)) => Self::ListNotFound(id),
            RepoError::NotFound(RecordRef::Item(id)) => Self::ItemNotFound(id),
            RepoError::NotFound(RecordRef::Pair(id)) => Self::PairNotFound(id),
            RepoError::Validation(err) => Self::InvalidInput(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<LedgerError> for RankingError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::PairNotFound(id) => Self::PairNotFound(id),
            LedgerError::InvalidWinner(value) => Self::InvalidWinner(value),
            LedgerError::Repo(err) => err.into(),
        }
    }
}

impl From<InsufficientItems> for RankingError {
    fn from(value: InsufficientItems) -> Self {
        Self::InsufficientItems {
            available: value.available,
        }
    }
}

impl From<ConfigError> for RankingError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ValidationError> for RankingError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

/// Freshly issued comparison with both participants for display.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedPair {
    pub pair: Pair,
    pub left: RatedItem,
    pub right: RatedItem,
}

/// Current ranking of one list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListStatus {
    pub list_id: ListId,
    /// Mean adjacent-rank win probability; 1.0 with fewer than two items.
    pub stability: f64,
    /// Active items, strongest first.
    pub ranked_items: Vec<RatedItem>,
    /// Sum of comparison counts over the active items.
    pub total_comparisons: u64,
}

/// Ranking service facade over repository implementations.
pub struct RankingService<R: RankingRepository> {
    repo: R,
    config: RankingConfig,
    sampler: PoolSampler,
}

impl<R: RankingRepository> RankingService<R> {
    /// Creates a service with default configuration.
    pub fn new(repo: R) -> Self {
        let config = RankingConfig::default();
        Self {
            repo,
            config,
            sampler: PoolSampler::new(config.pool_size, config.focus_size),
        }
    }

    /// Creates a service with a caller-provided configuration.
    ///
    /// # Errors
    /// - `RankingError::Config` when `config` fails validation.
    pub fn with_config(repo: R, config: RankingConfig) -> RankingResult<Self> {
        config.validate()?;
        Ok(Self {
            repo,
            config,
            sampler: PoolSampler::new(config.pool_size, config.focus_size),
        })
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn create_list(&self, name: &str) -> RankingResult<RankList> {
        let list = self.repo.create_list(name)?;
        info!("event=list_create module=service status=ok list_id={}", list.id);
        Ok(list)
    }

    pub fn get_list(&self, list_id: ListId) -> RankingResult<RankList> {
        self.repo
            .get_list(list_id)?
            .ok_or(RankingError::ListNotFound(list_id))
    }

    /// Lists all lists, newest first.
    pub fn list_lists(&self) -> RankingResult<Vec<RankList>> {
        Ok(self.repo.list_lists()?)
    }

    /// Adds an active item with the configured baseline rating.
    pub fn add_item(
        &self,
        list_id: ListId,
        kind: &str,
        payload: Value,
    ) -> RankingResult<RatedItem> {
        self.ensure_list(list_id)?;
        let item = Item::new(list_id, kind.trim(), payload);
        item.validate()?;

        let rating = Rating::baseline(self.config.default_strength);
        self.repo.create_item(&item, rating)?;
        info!(
            "event=item_create module=service status=ok list_id={} item_id={}",
            list_id, item.id
        );
        Ok(RatedItem { item, rating })
    }

    pub fn list_items(
        &self,
        list_id: ListId,
        include_inactive: bool,
    ) -> RankingResult<Vec<RatedItem>> {
        self.ensure_list(list_id)?;
        Ok(self.repo.list_items(list_id, include_inactive)?)
    }

    /// Applies a partial update. Reactivating an item keeps its old rating.
    pub fn update_item(
        &self,
        list_id: ListId,
        item_id: ItemId,
        patch: &ItemPatch,
    ) -> RankingResult<RatedItem> {
        self.ensure_list(list_id)?;
        let mut current = self
            .repo
            .get_item(item_id)?
            .filter(|rated| rated.item.list_id == list_id)
            .ok_or(RankingError::ItemNotFound(item_id))?;

        patch.apply_to(&mut current.item);
        self.repo.update_item(&current.item)?;
        info!(
            "event=item_update module=service status=ok list_id={} item_id={} active={}",
            list_id, item_id, current.item.active
        );
        Ok(current)
    }

    /// Soft-deletes an item. Later votes on its open pairs void them.
    pub fn remove_item(&self, list_id: ListId, item_id: ItemId) -> RankingResult<()> {
        self.ensure_list(list_id)?;
        self.repo.soft_delete_item(list_id, item_id)?;
        info!(
            "event=item_remove module=service status=ok list_id={} item_id={}",
            list_id, item_id
        );
        Ok(())
    }

    /// Samples and records the next comparison for `list_id`.
    pub fn request_pair(&self, list_id: ListId) -> RankingResult<IssuedPair> {
        self.request_pair_with_rng(list_id, &mut rand::rng())
    }

    /// Same as `request_pair`, drawing the focus item from `rng`.
    pub fn request_pair_with_rng<G: Rng>(
        &self,
        list_id: ListId,
        rng: &mut G,
    ) -> RankingResult<IssuedPair> {
        self.ensure_list(list_id)?;
        let candidates = self.repo.list_active_items(
            list_id,
            ItemOrder::ComparisonsAsc,
            Some(self.sampler.pool_size()),
        )?;
        let pool_len = candidates.len();

        let sampled = match self.sampler.sample(candidates, rng) {
            Ok(sampled) => sampled,
            Err(err) => {
                warn!(
                    "event=pair_issue module=service status=error list_id={} error_code=insufficient_items available={}",
                    list_id, err.available
                );
                return Err(err.into());
            }
        };

        let pair = ledger::issue_pair(&self.repo, list_id, &sampled)?;
        info!(
            "event=pair_issue module=service status=ok list_id={} pair_id={} pool_len={}",
            list_id, pair.id, pool_len
        );
        Ok(IssuedPair {
            pair,
            left: sampled.focus,
            right: sampled.opponent,
        })
    }

    /// Resolves a vote; `winner` is `left` or `right` (case-insensitive).
    pub fn submit_vote(
        &self,
        list_id: ListId,
        pair_id: PairId,
        winner: &str,
    ) -> RankingResult<VoteOutcome> {
        self.ensure_list(list_id)?;
        let outcome = ledger::resolve_pair(
            &self.repo,
            list_id,
            pair_id,
            winner,
            self.config.k_factor,
        )
        .map_err(|err| {
            warn!(
                "event=vote_submit module=service status=error list_id={} pair_id={} error={}",
                list_id, pair_id, err
            );
            RankingError::from(err)
        })?;

        match outcome {
            VoteOutcome::Applied { winner, .. } => info!(
                "event=vote_submit module=service status=ok list_id={} pair_id={} winner_id={}",
                list_id, pair_id, winner
            ),
            VoteOutcome::Ignored(reason) => info!(
                "event=vote_submit module=service status=ignored list_id={} pair_id={} reason={}",
                list_id, pair_id, reason
            ),
        }
        Ok(outcome)
    }

    /// Ranks the active items of `list_id` and scores convergence.
    pub fn get_status(&self, list_id: ListId) -> RankingResult<ListStatus> {
        self.ensure_list(list_id)?;
        let items = self
            .repo
            .list_active_items(list_id, ItemOrder::StrengthDesc, None)?;
        let report = stability::evaluate(items);
        let total_comparisons = report
            .ranked
            .iter()
            .map(|rated| u64::from(rated.rating.comparisons))
            .sum();

        Ok(ListStatus {
            list_id,
            stability: report.stability,
            ranked_items: report.ranked,
            total_comparisons,
        })
    }

    fn ensure_list(&self, list_id: ListId) -> RankingResult<()> {
        if self.repo.list_exists(list_id)? {
            Ok(())
        } else {
            Err(RankingError::ListNotFound(list_id))
        }
    }
}
