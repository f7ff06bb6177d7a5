//! Domain model for lists, items, ratings and comparison pairs.
//!
//! # Responsibility
//! - Define canonical records shared by storage, engine and service layers.
//! - Provide structural validation applied on every write and read-back.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Items are soft-deleted through their `active` flag, never removed.
//! - Pairs are never deleted; they form the vote audit trail.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod item;
pub mod pair;
pub mod rating;

/// Structural validation failure for a model record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// List name is empty after trimming.
    EmptyListName,
    /// Item kind label is empty after trimming.
    EmptyItemKind,
    /// Pair references the same item on both sides.
    SelfPair(Uuid),
    /// Pair winner is neither its left nor its right item.
    ForeignWinner { pair: Uuid, winner: Uuid },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyListName => write!(f, "list name cannot be empty"),
            Self::EmptyItemKind => write!(f, "item kind cannot be empty"),
            Self::SelfPair(item) => write!(f, "pair compares item {item} with itself"),
            Self::ForeignWinner { pair, winner } => {
                write!(f, "winner {winner} is not a participant of pair {pair}")
            }
        }
    }
}

impl Error for ValidationError {}
