//! Everything the dealer and the players share.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use tokio::sync::Mutex;

use crate::{
    PlayerId, Slot, board::Board, claims::ClaimQueue, config::GameConfig, oracle::SetOracle,
    ui::Ui,
};

/// Per-player state the dealer needs to read
#[derive(Debug)]
pub struct Seat {
    id: PlayerId,
    human: bool,
    /// Slots holding this player's tokens, in the order they were placed.
    /// Lock only while holding the board lock.
    pub selection: Mutex<Vec<Slot>>,
    score: AtomicU32,
}

impl Seat {
    pub fn new(id: PlayerId, human: bool) -> Self {
        Self {
            id,
            human,
            selection: Mutex::new(Vec::new()),
            score: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_human(&self) -> bool {
        self.human
    }

    pub fn score(&self) -> u32 {
        self.score.load(Ordering::Acquire)
    }

    /// Add a point, returning the new score
    pub fn add_point(&self) -> u32 {
        self.score.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Shared context of one running game
pub struct Table {
    pub config: Arc<GameConfig>,
    pub board: Board,
    pub claims: ClaimQueue,
    pub seats: Vec<Arc<Seat>>,
    pub oracle: Arc<dyn SetOracle>,
    pub ui: Arc<dyn Ui>,
}

impl Table {
    pub fn new(config: Arc<GameConfig>, oracle: Arc<dyn SetOracle>, ui: Arc<dyn Ui>) -> Self {
        let seats = (0..config.players)
            .map(|id| Arc::new(Seat::new(id, config.is_human(id))))
            .collect();
        Self {
            board: Board::new(&config, ui.clone()),
            claims: ClaimQueue::new(),
            seats,
            oracle,
            ui,
            config,
        }
    }

    pub fn seat(&self, player: PlayerId) -> Option<&Arc<Seat>> {
        self.seats.get(player)
    }

    pub fn scores(&self) -> Vec<u32> {
        self.seats.iter().map(|seat| seat.score()).collect()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("config", &self.config)
            .field("board", &self.board)
            .field("seats", &self.seats)
            .finish_non_exhaustive()
    }
}
