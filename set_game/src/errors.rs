//! Error types for the table engine.

use thiserror::Error;

use crate::{CardId, PlayerId, Slot};

/// Result type for configuration loading and validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed validation
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    /// Configuration file could not be parsed
    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for board mutations
pub type BoardResult<T> = Result<T, BoardError>;

/// Board precondition violations.
///
/// Players never see these; toggles on bad slots are silently rejected.
/// They guard dealer-side card movement.
#[derive(Debug, Clone, Copy, Error, Eq, PartialEq)]
pub enum BoardError {
    #[error("slot {0} is out of range")]
    SlotOutOfRange(Slot),

    #[error("card {0} is out of range")]
    CardOutOfRange(CardId),

    #[error("slot {0} already holds a card")]
    SlotOccupied(Slot),

    #[error("slot {0} is empty")]
    SlotEmpty(Slot),

    #[error("card {card} is already on slot {slot}")]
    CardOnBoard { card: CardId, slot: Slot },
}

/// Claim queue errors
#[derive(Debug, Clone, Copy, Error, Eq, PartialEq)]
pub enum ClaimError {
    #[error("player {0} already has a claim pending")]
    AlreadyPending(PlayerId),

    #[error("claim queue is closed")]
    Closed,
}

/// Input queue errors
#[derive(Debug, Clone, Copy, Error, Eq, PartialEq)]
pub enum InputError {
    #[error("input queue for player {0} is full")]
    QueueFull(PlayerId),

    #[error("input queue for player {0} is closed")]
    Closed(PlayerId),

    #[error("slot {slot} is out of range for player {player}")]
    InvalidSlot { player: PlayerId, slot: Slot },

    #[error("no such player: {0}")]
    UnknownPlayer(PlayerId),
}

/// Result type for game lifecycle operations
pub type GameResult<T> = Result<T, GameError>;

/// Game lifecycle errors
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid deck: {0}")]
    InvalidDeck(String),

    #[error("Dealer task failed: {0}")]
    DealerPanicked(#[from] tokio::task::JoinError),
}
