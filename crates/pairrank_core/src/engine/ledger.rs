//! Comparison ledger: the pair lifecycle `Open -> Resolved`.
//!
//! # Responsibility
//! - Issue open pairs for sampled comparisons.
//! - Resolve votes, applying at most one rating mutation per pair.
//!
//! # Invariants
//! - Resolution runs in one repository unit of work: the pair is re-read,
//!   participants are re-fetched fresh, and the pair is closed before any
//!   rating is written.
//! - A pair that is already resolved is never resolved again; the caller gets
//!   `Ignored(AlreadyAnswered)` instead of an error.
//! - A pair whose participant was removed or soft-deleted is closed as
//!   `Verdict::Void` without touching any rating.

use crate::engine::elo;
use crate::engine::sampler::SampledPair;
use crate::model::item::{ItemId, ListId};
use crate::model::pair::{Pair, PairId, Side, Verdict};
use crate::model::rating::{RatedItem, Rating};
use crate::repo::ranking_repo::{RankingRepository, RepoError, RepoResult};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a vote was accepted without a rating mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    AlreadyAnswered,
    ItemInactiveOrMissing,
}

impl IgnoredReason {
    /// Stable client-facing reason code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyAnswered => "already_answered",
            Self::ItemInactiveOrMissing => "item_inactive_or_missing",
        }
    }
}

impl Display for IgnoredReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successfully processed vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoteOutcome {
    /// Ratings were updated; values are the post-update ratings.
    Applied {
        winner: ItemId,
        left: Rating,
        right: Rating,
    },
    Ignored(IgnoredReason),
}

impl VoteOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn reason(&self) -> Option<IgnoredReason> {
        match self {
            Self::Applied { .. } => None,
            Self::Ignored(reason) => Some(*reason),
        }
    }
}

/// Structural failure while resolving a vote.
#[derive(Debug)]
pub enum LedgerError {
    PairNotFound(PairId),
    /// Winner input named neither side. Carries the rejected input.
    InvalidWinner(String),
    Repo(RepoError),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PairNotFound(id) => write!(f, "pair not found: {id}"),
            Self::InvalidWinner(value) => {
                write!(f, "winner must be `left` or `right`, got `{value}`")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Records a sampled comparison as an open pair.
///
/// The focus item is placed on the left, the opponent on the right.
pub fn issue_pair<R: RankingRepository>(
    repo: &R,
    list_id: ListId,
    sampled: &SampledPair,
) -> RepoResult<Pair> {
    let pair = Pair::open(list_id, sampled.focus.item.id, sampled.opponent.item.id);
    repo.insert_pair(&pair)?;
    Ok(pair)
}

/// Resolves one vote on `pair_id` with raw `winner` input (`left`/`right`).
///
/// # Errors
/// - `PairNotFound` when the pair does not exist in `list_id`.
/// - `InvalidWinner` when the pair is open, both participants are active,
///   and `winner` names neither side. The pair stays open.
pub fn resolve_pair<R: RankingRepository>(
    repo: &R,
    list_id: ListId,
    pair_id: PairId,
    winner: &str,
    k_factor: f64,
) -> Result<VoteOutcome, LedgerError> {
    repo.atomically(|repo| -> Result<VoteOutcome, LedgerError> {
        let pair = repo
            .get_pair(list_id, pair_id)?
            .ok_or(LedgerError::PairNotFound(pair_id))?;
        if !pair.is_open() {
            return Ok(VoteOutcome::Ignored(IgnoredReason::AlreadyAnswered));
        }

        let left = active_participant(repo, pair.left)?;
        let right = active_participant(repo, pair.right)?;
        let (left, right) = match (left, right) {
            (Some(left), Some(right)) => (left, right),
            _ => {
                if !repo.close_pair(pair.id, Verdict::Void)? {
                    return Ok(VoteOutcome::Ignored(IgnoredReason::AlreadyAnswered));
                }
                return Ok(VoteOutcome::Ignored(IgnoredReason::ItemInactiveOrMissing));
            }
        };

        let side: Side = winner
            .parse()
            .map_err(|_| LedgerError::InvalidWinner(winner.to_string()))?;
        let (winner_item, loser_item) = match side {
            Side::Left => (&left, &right),
            Side::Right => (&right, &left),
        };

        if !repo.close_pair(pair.id, Verdict::Winner(pair.item_on(side)))? {
            return Ok(VoteOutcome::Ignored(IgnoredReason::AlreadyAnswered));
        }

        let outcome = elo::apply_outcome(winner_item.rating, loser_item.rating, k_factor);
        repo.set_rating(winner_item.item.id, outcome.winner)?;
        repo.set_rating(loser_item.item.id, outcome.loser)?;

        let (left_rating, right_rating) = match side {
            Side::Left => (outcome.winner, outcome.loser),
            Side::Right => (outcome.loser, outcome.winner),
        };
        Ok(VoteOutcome::Applied {
            winner: winner_item.item.id,
            left: left_rating,
            right: right_rating,
        })
    })
}

fn active_participant<R: RankingRepository>(
    repo: &R,
    item_id: ItemId,
) -> RepoResult<Option<RatedItem>> {
    Ok(repo.get_item(item_id)?.filter(|rated| rated.item.active))
}
