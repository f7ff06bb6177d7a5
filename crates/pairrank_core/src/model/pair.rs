//! Comparison pair record and its lifecycle state.
//!
//! # Responsibility
//! - Model one issued "which is better" question between two items.
//! - Make the open/resolved lifecycle explicit in the type.
//!
//! # Invariants
//! - `left != right`.
//! - A recorded winner is always `left` or `right` of the same pair.
//! - `Open -> Resolved` is the only transition; `Resolved` is terminal.

use super::item::{ItemId, ListId};
use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable pair identifier.
pub type PairId = Uuid;

/// Position of a participant in a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text does not name a pair side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSide(pub String);

impl Display for UnknownSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "winner must be `left` or `right`, got `{}`", self.0)
    }
}

impl std::error::Error for UnknownSide {}

impl FromStr for Side {
    type Err = UnknownSide;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(UnknownSide(value.to_string())),
        }
    }
}

/// How a resolved pair was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// A vote was applied and this item won.
    Winner(ItemId),
    /// Closed without a rating mutation (participant inactive or missing).
    Void,
}

/// Lifecycle state of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    Open,
    Resolved(Verdict),
}

/// One issued comparison between two items of the same list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub id: PairId,
    pub list_id: ListId,
    pub left: ItemId,
    pub right: ItemId,
    pub state: PairState,
}

impl Pair {
    /// Creates a new open pair with a generated id.
    pub fn open(list_id: ListId, left: ItemId, right: ItemId) -> Self {
        Self {
            id: Uuid::new_v4(),
            list_id,
            left,
            right,
            state: PairState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PairState::Open)
    }

    /// Item id sitting on `side`.
    pub fn item_on(&self, side: Side) -> ItemId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Winning item, when the pair was resolved by an applied vote.
    pub fn winner(&self) -> Option<ItemId> {
        match self.state {
            PairState::Resolved(Verdict::Winner(id)) => Some(id),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.left == self.right {
            return Err(ValidationError::SelfPair(self.left));
        }
        if let Some(winner) = self.winner() {
            if winner != self.left && winner != self.right {
                return Err(ValidationError::ForeignWinner {
                    pair: self.id,
                    winner,
                });
            }
        }
        Ok(())
    }
}
