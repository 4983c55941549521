//! Starting, driving and stopping a game.

use std::{collections::HashSet, sync::Arc};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use tokio::task::JoinHandle;

use crate::{
    CardId, PlayerId, Slot,
    board::Board,
    config::GameConfig,
    dealer::{Dealer, GameOutcome},
    errors::{ConfigResult, GameError, GameResult, InputError},
    input::{InputSender, action_queue},
    oracle::SetOracle,
    player::Player,
    simulated::SimulatedInput,
    table::Table,
    termination::Terminator,
    ui::Ui,
};

/// A game ready to start
pub struct Game {
    config: Arc<GameConfig>,
    oracle: Arc<dyn SetOracle>,
    ui: Arc<dyn Ui>,
    deck: Option<Vec<CardId>>,
    seed: Option<u64>,
}

impl Game {
    pub fn new(
        config: GameConfig,
        oracle: Arc<dyn SetOracle>,
        ui: Arc<dyn Ui>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            oracle,
            ui,
            deck: None,
            seed: None,
        })
    }

    /// Deal these cards in this order instead of a shuffled full deck
    pub fn with_deck(mut self, deck: Vec<CardId>) -> Self {
        self.deck = Some(deck);
        self
    }

    /// Seed every random choice: deck shuffles and simulated presses
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Spawn the dealer, which in turn starts the players
    pub fn start(self) -> GameResult<GameHandle> {
        let deck = match self.deck {
            Some(deck) => {
                validate_deck(&deck, self.config.deck_size)?;
                deck
            }
            None => {
                let mut deck: Vec<CardId> = (0..self.config.deck_size).collect();
                match self.seed {
                    Some(seed) => deck.shuffle(&mut StdRng::seed_from_u64(seed)),
                    None => deck.shuffle(&mut StdRng::from_os_rng()),
                }
                deck
            }
        };

        let table = Arc::new(Table::new(
            self.config.clone(),
            self.oracle.clone(),
            self.ui.clone(),
        ));

        let mut inputs = Vec::with_capacity(self.config.players);
        let mut lineup = Vec::with_capacity(self.config.players);
        for seat in &table.seats {
            let (sender, receiver) = action_queue(
                seat.id(),
                self.config.table_size,
                self.config.feature_size,
            );
            let mut player = Player::new(seat.clone(), table.clone(), receiver);
            if !seat.is_human() {
                let mut input = SimulatedInput::new(
                    sender.clone(),
                    self.config.table_size,
                    self.config.ai_think(),
                );
                if let Some(seed) = self.seed {
                    input = input.with_seed(seed.wrapping_add(seat.id() as u64 + 1));
                }
                player = player.with_companion(input);
            }
            inputs.push(sender);
            lineup.push(player);
        }

        let terminator = Terminator::new();
        let mut dealer = Dealer::new(table.clone(), deck, lineup, terminator.signal());
        if let Some(seed) = self.seed {
            dealer = dealer.with_seed(seed);
        }

        log::info!(
            "starting game: {} players ({} human), {} cards",
            self.config.players,
            self.config.human_players,
            self.config.deck_size
        );
        let dealer = tokio::spawn(dealer.run());

        Ok(GameHandle {
            table,
            inputs,
            terminator,
            dealer,
        })
    }
}

fn validate_deck(deck: &[CardId], deck_size: usize) -> GameResult<()> {
    let mut seen = HashSet::with_capacity(deck.len());
    for &card in deck {
        if card >= deck_size {
            log::warn!("rejecting deck: card {} out of range", card);
            return Err(GameError::InvalidDeck(format!(
                "card {card} is outside 0..{deck_size}"
            )));
        }
        if !seen.insert(card) {
            log::warn!("rejecting deck: card {} appears twice", card);
            return Err(GameError::InvalidDeck(format!("card {card} appears twice")));
        }
    }
    Ok(())
}

/// A running game
pub struct GameHandle {
    table: Arc<Table>,
    inputs: Vec<InputSender>,
    terminator: Terminator,
    dealer: JoinHandle<GameOutcome>,
}

impl GameHandle {
    /// Queue a key press for `player`. Dropped when the queue is full.
    pub fn key_pressed(&self, player: PlayerId, slot: Slot) -> Result<(), InputError> {
        self.input(player)?.press(slot)
    }

    /// The action queue of `player`
    pub fn input(&self, player: PlayerId) -> Result<&InputSender, InputError> {
        self.inputs
            .get(player)
            .ok_or(InputError::UnknownPlayer(player))
    }

    pub fn score(&self, player: PlayerId) -> Option<u32> {
        self.table.seat(player).map(|seat| seat.score())
    }

    pub fn scores(&self) -> Vec<u32> {
        self.table.scores()
    }

    pub fn board(&self) -> &Board {
        &self.table.board
    }

    pub fn config(&self) -> &GameConfig {
        &self.table.config
    }

    /// A terminator that ends this game, for signal handlers and the like
    pub fn terminator(&self) -> Terminator {
        self.terminator.clone()
    }

    pub fn terminate(&self) {
        log::info!("termination requested");
        self.terminator.terminate();
    }

    pub fn is_finished(&self) -> bool {
        self.dealer.is_finished()
    }

    /// Wait for the game to end on its own or by termination
    pub async fn join(self) -> GameResult<GameOutcome> {
        Ok(self.dealer.await?)
    }

    /// Terminate and wait for every task to exit
    pub async fn shutdown(self) -> GameResult<GameOutcome> {
        self.terminate();
        self.join().await
    }
}
