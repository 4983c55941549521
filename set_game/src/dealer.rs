//! Dealer task.
//!
//! The dealer owns the deck and the round clock, starts the players, judges
//! claims strictly in arrival order and decides when the game is over. It
//! runs as a small state machine:
//!
//! ```text
//! Dealing ──► Running ──► Collecting ──► Dealing
//!    │           │
//!    └───────────┴──► Ended
//! ```

use std::{collections::VecDeque, sync::Arc, time::Duration};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    CardId, PlayerId,
    board::BoardGuard,
    claims::Verdict,
    clock::RoundClock,
    player::{Player, PlayerHandle},
    table::Table,
    termination::TerminationSignal,
};

/// Dealer states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealerPhase {
    /// Fill empty slots from the deck
    Dealing,
    /// Judge claims until the round clock runs out
    Running,
    /// Return the table to the deck and reshuffle
    Collecting,
    /// Stop players and announce winners
    Ended,
}

/// Final result of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    /// Score of every player, by id
    pub scores: Vec<u32>,
    /// Every player holding the highest score
    pub winners: Vec<PlayerId>,
    /// How many times the table was collected and the deck reshuffled
    pub reshuffles: u32,
}

impl GameOutcome {
    pub fn from_scores(scores: Vec<u32>, reshuffles: u32) -> Self {
        let best = scores.iter().copied().max().unwrap_or(0);
        let winners = scores
            .iter()
            .enumerate()
            .filter(|&(_, &score)| score == best)
            .map(|(player, _)| player)
            .collect();
        Self {
            scores,
            winners,
            reshuffles,
        }
    }
}

pub struct Dealer {
    table: Arc<Table>,
    deck: VecDeque<CardId>,
    clock: RoundClock,
    rng: StdRng,
    stop: TerminationSignal,
    lineup: Vec<Player>,
    players: Vec<PlayerHandle>,
    reshuffles: u32,
}

impl Dealer {
    /// `deck` is dealt front to back as given; it is only shuffled when the
    /// table is collected.
    pub fn new(
        table: Arc<Table>,
        deck: Vec<CardId>,
        lineup: Vec<Player>,
        stop: TerminationSignal,
    ) -> Self {
        Self {
            clock: RoundClock::from_config(&table.config),
            table,
            deck: deck.into(),
            rng: StdRng::from_os_rng(),
            stop,
            lineup,
            players: Vec::new(),
            reshuffles: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn deck(&self) -> &VecDeque<CardId> {
        &self.deck
    }

    /// Play the game to the end
    pub async fn run(mut self) -> GameOutcome {
        log::info!(
            "dealer starting with {} players and {} cards",
            self.lineup.len(),
            self.deck.len()
        );
        for player in std::mem::take(&mut self.lineup) {
            self.players.push(player.spawn());
        }

        let mut phase = DealerPhase::Dealing;
        while phase != DealerPhase::Ended {
            phase = self.step(phase).await;
            log::debug!("dealer phase: {:?}", phase);
        }

        let outcome = self.finish().await;
        log::info!("dealer terminated, winners: {:?}", outcome.winners);
        outcome
    }

    /// Run one phase and return the next
    pub async fn step(&mut self, phase: DealerPhase) -> DealerPhase {
        match phase {
            DealerPhase::Dealing => self.deal().await,
            DealerPhase::Running => self.run_round().await,
            DealerPhase::Collecting => {
                self.collect().await;
                DealerPhase::Dealing
            }
            DealerPhase::Ended => DealerPhase::Ended,
        }
    }

    async fn deal(&mut self) -> DealerPhase {
        if self.should_finish().await {
            return DealerPhase::Ended;
        }
        self.place_cards().await;
        if !self.table_has_set().await {
            log::debug!("no set on the table, collecting");
            return DealerPhase::Collecting;
        }
        DealerPhase::Running
    }

    async fn run_round(&mut self) -> DealerPhase {
        self.clock.reset();
        self.push_countdown();

        loop {
            let wait = self.table.config.poll_interval().min(self.clock.remaining());
            let claims = tokio::select! {
                biased;
                _ = self.stop.terminated() => return DealerPhase::Ended,
                claims = self.table.claims.drain(wait) => claims,
            };

            for player in claims {
                self.judge(player).await;
            }
            self.place_cards().await;

            if self.stop.is_terminated() {
                return DealerPhase::Ended;
            }
            if !self.table_has_set().await {
                log::debug!("no set left on the table, collecting");
                self.judge_queued().await;
                return DealerPhase::Collecting;
            }

            self.push_countdown();
            if self.clock.is_expired() {
                log::debug!("round clock expired");
                self.judge_queued().await;
                return DealerPhase::Collecting;
            }
        }
    }

    /// Judge every claim already in the queue without waiting for more
    async fn judge_queued(&mut self) {
        for player in self.table.claims.drain(Duration::ZERO).await {
            self.judge(player).await;
        }
    }

    /// Re-check `player`'s claim against the board and post the verdict.
    ///
    /// The board lock is held from validation to the last mutation, so every
    /// later claim sees the result.
    pub async fn judge(&mut self, player: PlayerId) -> Verdict {
        let table = self.table.clone();
        let Some(seat) = table.seat(player) else {
            log::warn!("claim from unknown player {}", player);
            return Verdict::None;
        };

        let verdict = {
            let mut board = table.board.lock().await;
            let mut selection = seat.selection.lock().await;
            let claimed = selection.clone();

            let cards = if claimed.len() == table.config.feature_size
                && claimed.iter().all(|&slot| board.has_token(player, slot))
            {
                board.snapshot_slots(&claimed)
            } else {
                None
            };

            match cards {
                None => Verdict::None,
                Some(cards) if table.oracle.is_valid_set(&cards) => {
                    selection.clear();
                    drop(selection);
                    for &slot in &claimed {
                        if let Err(e) = board.remove_card(slot).await {
                            log::error!("could not remove scored card: {}", e);
                        }
                    }
                    self.prune_selections(&board).await;
                    self.clock.reset();
                    self.push_countdown();
                    Verdict::Score
                }
                Some(_) => {
                    // A full selection holds every token the player has
                    board.clear_player_tokens(player);
                    selection.clear();
                    Verdict::Penalty
                }
            }
        };

        log::debug!("player {} claim judged: {:?}", player, verdict);
        table.claims.post_verdict(player, verdict).await;
        verdict
    }

    /// Drop slots from every selection whose token went away with a card
    async fn prune_selections(&self, board: &BoardGuard<'_>) {
        for seat in &self.table.seats {
            seat.selection
                .lock()
                .await
                .retain(|&slot| board.has_token(seat.id(), slot));
        }
    }

    /// Fill empty slots from the front of the deck
    async fn place_cards(&mut self) {
        let table = self.table.clone();
        let mut board = table.board.lock().await;
        let mut placed = false;

        for slot in board.empty_slots() {
            let Some(card) = self.deck.pop_front() else {
                break;
            };
            match board.place_card(card, slot).await {
                Ok(()) => placed = true,
                Err(e) => {
                    log::error!("could not deal card {}: {}", card, e);
                    self.deck.push_back(card);
                }
            }
        }

        if placed && table.config.hints {
            for set in board.hints(table.oracle.as_ref()) {
                log::info!("hint: set at slots {:?}", set);
            }
        }
    }

    /// Return every card on the table to the deck and reshuffle
    async fn collect(&mut self) {
        // Claimed slots stay on the table until their claims are answered
        self.judge_queued().await;

        let table = self.table.clone();
        {
            let mut board = table.board.lock().await;
            for slot in board.occupied_slots() {
                match board.remove_card(slot).await {
                    Ok(card) => self.deck.push_back(card),
                    Err(e) => log::error!("could not collect slot {}: {}", slot, e),
                }
            }
            for seat in &table.seats {
                seat.selection.lock().await.clear();
            }
        }

        self.deck.make_contiguous().shuffle(&mut self.rng);
        self.reshuffles += 1;
        log::info!(
            "table collected, {} cards reshuffled (reshuffle #{})",
            self.deck.len(),
            self.reshuffles
        );
    }

    async fn table_has_set(&self) -> bool {
        let cards = self.table.board.cards_present().await;
        self.table.oracle.exists_set(&cards)
    }

    /// Termination was requested, or no set can ever be formed again
    async fn should_finish(&self) -> bool {
        if self.stop.is_terminated() {
            return true;
        }
        let mut remaining: Vec<CardId> = self.deck.iter().copied().collect();
        remaining.extend(self.table.board.cards_present().await);
        !self.table.oracle.exists_set(&remaining)
    }

    fn push_countdown(&self) {
        let (remaining, warning) = self.clock.countdown();
        self.table.ui.set_countdown(remaining, warning);
    }

    async fn finish(&mut self) -> GameOutcome {
        self.table.claims.close().await;
        while let Some(player) = self.players.pop() {
            log::debug!("stopping player {}", player.id());
            player.stop().await;
        }

        let outcome = GameOutcome::from_scores(self.table.scores(), self.reshuffles);
        self.table.ui.announce_winners(&outcome.winners);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GameConfig,
        oracle::FeatureOracle,
        termination::Terminator,
        ui::{ChannelUi, UiEvent},
    };
    use tokio::sync::mpsc;

    fn setup(deck: Vec<CardId>) -> (Dealer, Arc<Table>, mpsc::UnboundedReceiver<UiEvent>) {
        let (ui, events) = ChannelUi::new();
        let table = Arc::new(Table::new(
            Arc::new(GameConfig::default()),
            Arc::new(FeatureOracle::new(3, 4)),
            Arc::new(ui),
        ));
        let dealer =
            Dealer::new(table.clone(), deck, Vec::new(), Terminator::new().signal()).with_seed(5);
        (dealer, table, events)
    }

    /// Place tokens for `player` on `slots` the way the player task would
    async fn select(table: &Table, player: PlayerId, slots: &[usize]) {
        let mut board = table.board.lock().await;
        let mut selection = table.seats[player].selection.lock().await;
        for &slot in slots {
            board.toggle_token(player, slot);
            selection.push(slot);
        }
    }

    #[test]
    fn test_outcome_ties() {
        let outcome = GameOutcome::from_scores(vec![2, 5, 5, 1], 3);
        assert_eq!(outcome.winners, vec![1, 2]);
        assert_eq!(outcome.reshuffles, 3);

        let nobody_scored = GameOutcome::from_scores(vec![0, 0], 0);
        assert_eq!(nobody_scored.winners, vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dealing_fills_in_deck_order() {
        let (mut dealer, table, _events) = setup((0..20).collect());
        assert_eq!(dealer.step(DealerPhase::Dealing).await, DealerPhase::Running);
        assert_eq!(table.board.cards_present().await, (0..12).collect::<Vec<_>>());
        assert_eq!(dealer.deck().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_judge_valid_claim_scores() {
        let (mut dealer, table, _events) = setup((0..12).collect());
        dealer.step(DealerPhase::Dealing).await;
        select(&table, 0, &[0, 1, 2]).await;
        let ticket = table.claims.submit(0).await.unwrap();

        assert_eq!(dealer.judge(0).await, Verdict::Score);
        assert_eq!(ticket.verdict().await, Verdict::Score);
        let board = table.board.snapshot().await;
        assert_eq!(board.empty_slots(), vec![0, 1, 2]);
        assert!(table.seats[0].selection.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_judge_invalid_claim_penalizes() {
        let (mut dealer, table, _events) = setup((0..12).collect());
        dealer.step(DealerPhase::Dealing).await;
        // cards 0, 1, 3: first feature 0, 1, 0
        select(&table, 0, &[0, 1, 3]).await;
        select(&table, 1, &[0]).await;
        let ticket = table.claims.submit(0).await.unwrap();

        assert_eq!(dealer.judge(0).await, Verdict::Penalty);
        assert_eq!(ticket.verdict().await, Verdict::Penalty);
        assert_eq!(table.board.count_cards().await, 12);
        assert!(table.board.tokens_of(0).await.is_empty());
        assert_eq!(table.board.tokens_of(1).await, vec![0]);
        assert!(table.seats[0].selection.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_slot_second_claim_is_stale() {
        let (mut dealer, table, _events) = setup((0..12).collect());
        dealer.step(DealerPhase::Dealing).await;
        // 0,1,2 and 2,5,8 are both sets and share slot 2
        select(&table, 0, &[0, 1, 2]).await;
        select(&table, 1, &[2, 5, 8]).await;
        let first = table.claims.submit(0).await.unwrap();
        let second = table.claims.submit(1).await.unwrap();

        for player in table.claims.drain(Duration::ZERO).await {
            dealer.judge(player).await;
        }
        assert_eq!(first.verdict().await, Verdict::Score);
        assert_eq!(second.verdict().await, Verdict::None);

        // Player 1 keeps the tokens that still stand
        assert_eq!(*table.seats[1].selection.lock().await, vec![5, 8]);
        assert_eq!(table.board.tokens_of(1).await, vec![5, 8]);
        assert_eq!(table.scores(), vec![0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_returns_cards_and_reshuffles() {
        let (mut dealer, table, _events) = setup((0..20).collect());
        dealer.step(DealerPhase::Dealing).await;
        select(&table, 1, &[3]).await;

        assert_eq!(
            dealer.step(DealerPhase::Collecting).await,
            DealerPhase::Dealing
        );
        assert_eq!(table.board.count_cards().await, 0);
        assert!(table.board.tokens_of(1).await.is_empty());
        assert!(table.seats[1].selection.lock().await.is_empty());

        let mut deck: Vec<CardId> = dealer.deck().iter().copied().collect();
        assert_eq!(deck.len(), 20);
        deck.sort_unstable();
        assert_eq!(deck, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_judges_queued_claim_first() {
        let (mut dealer, table, _events) = setup((0..20).collect());
        dealer.step(DealerPhase::Dealing).await;
        select(&table, 0, &[0, 1, 2]).await;
        let ticket = table.claims.submit(0).await.unwrap();

        dealer.step(DealerPhase::Collecting).await;

        assert_eq!(ticket.verdict().await, Verdict::Score);
        assert_eq!(table.claims.pending().await, 0);
        // The three scored cards left the game, the other nine were reshuffled
        assert_eq!(table.board.count_cards().await, 0);
        assert_eq!(dealer.deck().len(), 17);
        assert!(dealer.deck().iter().all(|&card| card > 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_claims_judged_in_order() {
        let (mut dealer, table, _events) = setup((0..20).collect());
        dealer.step(DealerPhase::Dealing).await;
        // cards 0, 1, 3: not a set
        select(&table, 0, &[0, 1, 3]).await;
        select(&table, 1, &[2, 5, 8]).await;
        let first = table.claims.submit(0).await.unwrap();
        let second = table.claims.submit(1).await.unwrap();

        dealer.judge_queued().await;

        assert_eq!(first.verdict().await, Verdict::Penalty);
        assert_eq!(second.verdict().await, Verdict::Score);
        assert!(table.board.tokens_of(0).await.is_empty());
        assert_eq!(table.board.snapshot().await.empty_slots(), vec![2, 5, 8]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_set_left_ends_game() {
        // (0,0) (1,0) (0,1) (1,1) in the first two features: no line
        let (mut dealer, _table, _events) = setup(vec![0, 1, 3, 4]);
        assert_eq!(dealer.step(DealerPhase::Dealing).await, DealerPhase::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ends_when_sets_run_out() {
        let (ui, mut events) = ChannelUi::new();
        let table = Arc::new(Table::new(
            Arc::new(GameConfig::default()),
            Arc::new(FeatureOracle::new(3, 4)),
            Arc::new(ui),
        ));
        let terminator = Terminator::new();
        let dealer = Dealer::new(table.clone(), vec![0, 1, 3, 4], Vec::new(), terminator.signal());

        let outcome = dealer.run().await;
        assert_eq!(outcome.scores, vec![0, 0]);
        assert_eq!(outcome.winners, vec![0, 1]);

        let announced = std::iter::from_fn(|| events.try_recv().ok())
            .any(|e| e == UiEvent::Winners { players: vec![0, 1] });
        assert!(announced);
        assert!(table.claims.is_closed().await);
    }
}
