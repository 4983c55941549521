//! # Set Game
//!
//! A concurrent table engine for the card game Set.
//!
//! One dealer task and one task per player share a board of card slots.
//! Players place tokens on slots; once a player holds a full set of tokens
//! it claims the set and waits while the dealer judges claims one at a time,
//! in arrival order. Computer players are driven by a simulated input task
//! that presses random slots.
//!
//! ## Architecture
//!
//! The dealer cycles through four phases:
//!
//! - **Dealing**: Fill empty slots from the deck
//! - **Running**: Judge claims until the round clock expires
//! - **Collecting**: Return the table to the deck and reshuffle
//! - **Ended**: Stop the players and announce the winners
//!
//! Lock order is always board before a player's selection.
//!
//! ## Core Modules
//!
//! - [`board`]: Slots, cards and tokens
//! - [`claims`]: FIFO claim queue with one-shot verdicts
//! - [`dealer`]: The dealer state machine
//! - [`player`]: Player task and freezes
//! - [`game`]: Start, drive and stop a game
//!
//! The rules of the game and the rendering are supplied through the
//! [`SetOracle`] and [`Ui`] traits.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use set_game::{FeatureOracle, Game, GameConfig, LogUi};
//!
//! # async fn play() -> Result<(), set_game::GameError> {
//! let config = GameConfig::default();
//! let oracle = Arc::new(FeatureOracle::from_config(&config));
//! let handle = Game::new(config, oracle, Arc::new(LogUi))?.start()?;
//! let outcome = handle.join().await?;
//! println!("winners: {:?}", outcome.winners);
//! # Ok(())
//! # }
//! ```

/// Card identifier, `0..deck_size`
pub type CardId = usize;

/// Table position, `0..table_size`
pub type Slot = usize;

/// Player identifier, `0..players`
pub type PlayerId = usize;

pub mod board;
pub mod claims;
pub mod clock;
pub mod config;
pub mod dealer;
pub mod errors;
pub mod game;
pub mod input;
pub mod oracle;
pub mod player;
pub mod simulated;
pub mod table;
pub mod termination;
pub mod ui;

pub use board::{Board, BoardState, TokenToggle};
pub use claims::{ClaimQueue, ClaimTicket, Verdict};
pub use clock::RoundClock;
pub use config::GameConfig;
pub use dealer::{DealerPhase, GameOutcome};
pub use errors::{
    BoardError, ClaimError, ConfigError, ConfigResult, GameError, GameResult, InputError,
};
pub use game::{Game, GameHandle};
pub use oracle::{FeatureOracle, SetOracle};
pub use termination::{TerminationSignal, Terminator};
pub use ui::{ChannelUi, LogUi, NullUi, Ui, UiEvent};
