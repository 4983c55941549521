//! Shared board: which card lies on which slot, and which player has a token
//! on which slot.
//!
//! [`BoardState`] is the plain data structure. [`Board`] puts it behind a
//! single async lock and adds what the outside world sees: the UI callbacks
//! and the simulated latency of moving cards. The dealer holds the lock via
//! [`BoardGuard`] for a whole validate-and-mutate step.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    CardId, PlayerId, Slot,
    config::GameConfig,
    errors::{BoardError, BoardResult},
    oracle::SetOracle,
    ui::Ui,
};

/// What a token toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenToggle {
    /// Token placed
    Added,
    /// Existing token taken back
    Removed,
    /// Nothing changed: empty slot, or the player is out of tokens
    Rejected,
}

/// Slot/card mapping and token grid.
///
/// Invariants:
/// - `slot_to_card[s] == Some(c)` iff `card_to_slot[c] == Some(s)`
/// - a token only ever sits on a slot that holds a card
/// - a player holds at most `max_tokens` tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    slot_to_card: Vec<Option<CardId>>,
    card_to_slot: Vec<Option<Slot>>,
    tokens: Vec<Vec<bool>>,
    token_counts: Vec<usize>,
    max_tokens: usize,
}

impl BoardState {
    pub fn new(table_size: usize, deck_size: usize, players: usize, max_tokens: usize) -> Self {
        Self {
            slot_to_card: vec![None; table_size],
            card_to_slot: vec![None; deck_size],
            tokens: vec![vec![false; players]; table_size],
            token_counts: vec![0; players],
            max_tokens,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.table_size,
            config.deck_size,
            config.players,
            config.feature_size,
        )
    }

    pub fn table_size(&self) -> usize {
        self.slot_to_card.len()
    }

    pub fn players(&self) -> usize {
        self.token_counts.len()
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn card_at(&self, slot: Slot) -> Option<CardId> {
        self.slot_to_card.get(slot).copied().flatten()
    }

    pub fn slot_of(&self, card: CardId) -> Option<Slot> {
        self.card_to_slot.get(card).copied().flatten()
    }

    /// Check that `card` may go onto `slot`
    pub fn can_place(&self, card: CardId, slot: Slot) -> BoardResult<()> {
        if slot >= self.table_size() {
            return Err(BoardError::SlotOutOfRange(slot));
        }
        if card >= self.card_to_slot.len() {
            return Err(BoardError::CardOutOfRange(card));
        }
        if self.slot_to_card[slot].is_some() {
            return Err(BoardError::SlotOccupied(slot));
        }
        if let Some(at) = self.card_to_slot[card] {
            return Err(BoardError::CardOnBoard { card, slot: at });
        }
        Ok(())
    }

    pub fn place_card(&mut self, card: CardId, slot: Slot) -> BoardResult<()> {
        self.can_place(card, slot)?;
        self.slot_to_card[slot] = Some(card);
        self.card_to_slot[card] = Some(slot);
        Ok(())
    }

    /// Take the card off `slot`, clearing every token on it.
    ///
    /// Returns the card and the players whose tokens were cleared.
    pub fn remove_card(&mut self, slot: Slot) -> BoardResult<(CardId, Vec<PlayerId>)> {
        let card = self
            .slot_to_card
            .get(slot)
            .copied()
            .ok_or(BoardError::SlotOutOfRange(slot))?
            .ok_or(BoardError::SlotEmpty(slot))?;

        self.slot_to_card[slot] = None;
        self.card_to_slot[card] = None;

        let mut cleared = Vec::new();
        for (player, token) in self.tokens[slot].iter_mut().enumerate() {
            if *token {
                *token = false;
                self.token_counts[player] -= 1;
                cleared.push(player);
            }
        }
        Ok((card, cleared))
    }

    pub fn has_token(&self, player: PlayerId, slot: Slot) -> bool {
        self.tokens
            .get(slot)
            .and_then(|row| row.get(player))
            .copied()
            .unwrap_or(false)
    }

    /// Take the token back if `player` has one on `slot`, else place one if
    /// the slot holds a card and the player has a token left.
    pub fn toggle_token(&mut self, player: PlayerId, slot: Slot) -> TokenToggle {
        if player >= self.players() || slot >= self.table_size() {
            return TokenToggle::Rejected;
        }
        if self.remove_token(player, slot) {
            return TokenToggle::Removed;
        }
        if self.slot_to_card[slot].is_none() || self.token_counts[player] >= self.max_tokens {
            return TokenToggle::Rejected;
        }
        self.tokens[slot][player] = true;
        self.token_counts[player] += 1;
        TokenToggle::Added
    }

    /// Returns true iff a token was removed
    pub fn remove_token(&mut self, player: PlayerId, slot: Slot) -> bool {
        if !self.has_token(player, slot) {
            return false;
        }
        self.tokens[slot][player] = false;
        self.token_counts[player] -= 1;
        true
    }

    /// Remove every token of `player`, returning the slots they were on
    pub fn clear_player_tokens(&mut self, player: PlayerId) -> Vec<Slot> {
        let slots = self.tokens_of(player);
        for &slot in &slots {
            self.remove_token(player, slot);
        }
        slots
    }

    /// Slots `player` has a token on, in slot order
    pub fn tokens_of(&self, player: PlayerId) -> Vec<Slot> {
        (0..self.table_size())
            .filter(|&slot| self.has_token(player, slot))
            .collect()
    }

    pub fn token_count(&self, player: PlayerId) -> usize {
        self.token_counts.get(player).copied().unwrap_or(0)
    }

    pub fn count_cards(&self) -> usize {
        self.slot_to_card.iter().filter(|c| c.is_some()).count()
    }

    /// Cards on the table, in slot order
    pub fn cards_present(&self) -> Vec<CardId> {
        self.slot_to_card.iter().flatten().copied().collect()
    }

    pub fn empty_slots(&self) -> Vec<Slot> {
        (0..self.table_size())
            .filter(|&slot| self.slot_to_card[slot].is_none())
            .collect()
    }

    pub fn occupied_slots(&self) -> Vec<Slot> {
        (0..self.table_size())
            .filter(|&slot| self.slot_to_card[slot].is_some())
            .collect()
    }

    /// The cards on `slots`, or `None` if any of them is empty
    pub fn snapshot_slots(&self, slots: &[Slot]) -> Option<Vec<CardId>> {
        slots.iter().map(|&slot| self.card_at(slot)).collect()
    }

    /// Every legal set on the table, as sorted slot lists
    pub fn hints(&self, oracle: &dyn SetOracle) -> Vec<Vec<Slot>> {
        oracle
            .find_sets(&self.cards_present(), usize::MAX)
            .into_iter()
            .map(|set| {
                let mut slots: Vec<Slot> = set.iter().filter_map(|&c| self.slot_of(c)).collect();
                slots.sort_unstable();
                slots
            })
            .collect()
    }
}

/// The board as shared between the dealer and the players
pub struct Board {
    state: Mutex<BoardState>,
    ui: Arc<dyn Ui>,
    placement_delay: Duration,
}

impl Board {
    pub fn new(config: &GameConfig, ui: Arc<dyn Ui>) -> Self {
        Self {
            state: Mutex::new(BoardState::from_config(config)),
            ui,
            placement_delay: config.placement_delay(),
        }
    }

    /// Acquire the board lock
    pub async fn lock(&self) -> BoardGuard<'_> {
        BoardGuard {
            state: self.state.lock().await,
            board: self,
        }
    }

    pub async fn count_cards(&self) -> usize {
        self.state.lock().await.count_cards()
    }

    pub async fn cards_present(&self) -> Vec<CardId> {
        self.state.lock().await.cards_present()
    }

    pub async fn snapshot_slots(&self, slots: &[Slot]) -> Option<Vec<CardId>> {
        self.state.lock().await.snapshot_slots(slots)
    }

    pub async fn tokens_of(&self, player: PlayerId) -> Vec<Slot> {
        self.state.lock().await.tokens_of(player)
    }

    /// A consistent copy of the whole board
    pub async fn snapshot(&self) -> BoardState {
        self.state.lock().await.clone()
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("placement_delay", &self.placement_delay)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to the board. Mutations go through here so the UI
/// always hears about them.
pub struct BoardGuard<'a> {
    state: MutexGuard<'a, BoardState>,
    board: &'a Board,
}

impl BoardGuard<'_> {
    /// Put `card` on the empty `slot` after the placement delay
    pub async fn place_card(&mut self, card: CardId, slot: Slot) -> BoardResult<()> {
        self.state.can_place(card, slot)?;
        tokio::time::sleep(self.board.placement_delay).await;
        self.state.place_card(card, slot)?;
        self.board.ui.show_card(card, slot);
        Ok(())
    }

    /// Take the card off `slot` after the placement delay. Every token on
    /// the slot goes with it.
    pub async fn remove_card(&mut self, slot: Slot) -> BoardResult<CardId> {
        if self.state.card_at(slot).is_none() {
            return Err(if slot < self.state.table_size() {
                BoardError::SlotEmpty(slot)
            } else {
                BoardError::SlotOutOfRange(slot)
            });
        }
        tokio::time::sleep(self.board.placement_delay).await;
        let (card, _) = self.state.remove_card(slot)?;
        self.board.ui.hide_all_tokens(slot);
        self.board.ui.hide_card(slot);
        Ok(card)
    }

    pub fn toggle_token(&mut self, player: PlayerId, slot: Slot) -> TokenToggle {
        let outcome = self.state.toggle_token(player, slot);
        match outcome {
            TokenToggle::Added => self.board.ui.show_token(player, slot),
            TokenToggle::Removed => self.board.ui.hide_token(player, slot),
            TokenToggle::Rejected => {}
        }
        outcome
    }

    /// Remove every token of `player`, returning the slots they were on
    pub fn clear_player_tokens(&mut self, player: PlayerId) -> Vec<Slot> {
        let slots = self.state.clear_player_tokens(player);
        for &slot in &slots {
            self.board.ui.hide_token(player, slot);
        }
        slots
    }
}

impl Deref for BoardGuard<'_> {
    type Target = BoardState;

    fn deref(&self) -> &BoardState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{ChannelUi, UiEvent};

    fn state() -> BoardState {
        BoardState::new(12, 81, 2, 3)
    }

    fn assert_consistent(board: &BoardState) {
        for slot in 0..board.table_size() {
            if let Some(card) = board.card_at(slot) {
                assert_eq!(board.slot_of(card), Some(slot));
            } else {
                for player in 0..board.players() {
                    assert!(!board.has_token(player, slot));
                }
            }
        }
        for player in 0..board.players() {
            assert_eq!(board.tokens_of(player).len(), board.token_count(player));
            assert!(board.token_count(player) <= board.max_tokens());
        }
    }

    #[test]
    fn test_place_and_remove_keep_mappings_inverse() {
        let mut board = state();
        board.place_card(40, 3).unwrap();
        assert_eq!(board.card_at(3), Some(40));
        assert_eq!(board.slot_of(40), Some(3));

        let (card, cleared) = board.remove_card(3).unwrap();
        assert_eq!(card, 40);
        assert!(cleared.is_empty());
        assert_eq!(board.card_at(3), None);
        assert_eq!(board.slot_of(40), None);
        assert_consistent(&board);
    }

    #[test]
    fn test_place_preconditions() {
        let mut board = state();
        board.place_card(1, 0).unwrap();
        assert_eq!(board.place_card(2, 0), Err(BoardError::SlotOccupied(0)));
        assert_eq!(
            board.place_card(1, 5),
            Err(BoardError::CardOnBoard { card: 1, slot: 0 })
        );
        assert_eq!(board.place_card(2, 12), Err(BoardError::SlotOutOfRange(12)));
        assert_eq!(board.place_card(81, 1), Err(BoardError::CardOutOfRange(81)));
        assert_eq!(board.remove_card(4), Err(BoardError::SlotEmpty(4)));
        assert_consistent(&board);
    }

    #[test]
    fn test_toggle_requires_card() {
        let mut board = state();
        assert_eq!(board.toggle_token(0, 2), TokenToggle::Rejected);
        board.place_card(7, 2).unwrap();
        assert_eq!(board.toggle_token(0, 2), TokenToggle::Added);
        assert!(board.has_token(0, 2));
    }

    #[test]
    fn test_toggle_twice_restores() {
        let mut board = state();
        board.place_card(7, 2).unwrap();
        let before = board.clone();
        assert_eq!(board.toggle_token(1, 2), TokenToggle::Added);
        assert_eq!(board.toggle_token(1, 2), TokenToggle::Removed);
        assert_eq!(board, before);
    }

    #[test]
    fn test_token_cap() {
        let mut board = state();
        for slot in 0..4 {
            board.place_card(slot, slot).unwrap();
        }
        for slot in 0..3 {
            assert_eq!(board.toggle_token(0, slot), TokenToggle::Added);
        }
        assert_eq!(board.toggle_token(0, 3), TokenToggle::Rejected);
        // Removing one frees a token
        assert_eq!(board.toggle_token(0, 1), TokenToggle::Removed);
        assert_eq!(board.toggle_token(0, 3), TokenToggle::Added);
        // The other player is unaffected
        assert_eq!(board.toggle_token(1, 1), TokenToggle::Added);
        assert_consistent(&board);
    }

    #[test]
    fn test_remove_card_clears_all_tokens_on_slot() {
        let mut board = state();
        board.place_card(9, 4).unwrap();
        board.place_card(10, 5).unwrap();
        board.toggle_token(0, 4);
        board.toggle_token(1, 4);
        board.toggle_token(1, 5);

        let (_, cleared) = board.remove_card(4).unwrap();
        assert_eq!(cleared, vec![0, 1]);
        assert!(!board.has_token(0, 4));
        assert!(!board.has_token(1, 4));
        assert!(board.has_token(1, 5));
        assert_eq!(board.token_count(0), 0);
        assert_eq!(board.token_count(1), 1);
        assert_consistent(&board);
    }

    #[test]
    fn test_clear_player_tokens_leaves_others() {
        let mut board = state();
        for slot in 0..3 {
            board.place_card(slot + 20, slot).unwrap();
            board.toggle_token(0, slot);
            board.toggle_token(1, slot);
        }
        assert_eq!(board.clear_player_tokens(0), vec![0, 1, 2]);
        assert!(board.tokens_of(0).is_empty());
        assert_eq!(board.tokens_of(1), vec![0, 1, 2]);
        assert_eq!(board.count_cards(), 3);
    }

    #[test]
    fn test_snapshot_and_queries() {
        let mut board = state();
        board.place_card(30, 0).unwrap();
        board.place_card(31, 2).unwrap();
        assert_eq!(board.count_cards(), 2);
        assert_eq!(board.cards_present(), vec![30, 31]);
        assert_eq!(board.snapshot_slots(&[2, 0]), Some(vec![31, 30]));
        assert_eq!(board.snapshot_slots(&[0, 1]), None);
        assert_eq!(board.occupied_slots(), vec![0, 2]);
        assert_eq!(board.empty_slots().len(), 10);
    }

    #[test]
    fn test_hints_report_slots() {
        let oracle = crate::oracle::FeatureOracle::new(3, 4);
        let mut board = state();
        // 0, 1, 2 form a set; 4 does not complete anything with them
        board.place_card(2, 1).unwrap();
        board.place_card(0, 7).unwrap();
        board.place_card(1, 3).unwrap();
        board.place_card(4, 0).unwrap();
        assert_eq!(board.hints(&oracle), vec![vec![1, 3, 7]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_notifies_ui() {
        let (ui, mut rx) = ChannelUi::new();
        let config = GameConfig::default();
        let board = Board::new(&config, Arc::new(ui));

        {
            let mut guard = board.lock().await;
            guard.place_card(12, 6).await.unwrap();
            assert_eq!(guard.toggle_token(1, 6), TokenToggle::Added);
            assert_eq!(guard.remove_card(6).await.unwrap(), 12);
            assert_eq!(guard.remove_card(6).await, Err(BoardError::SlotEmpty(6)));
        }

        let events: Vec<UiEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                UiEvent::ShowCard { card: 12, slot: 6 },
                UiEvent::ShowToken { player: 1, slot: 6 },
                UiEvent::HideAllTokens { slot: 6 },
                UiEvent::HideCard { slot: 6 },
            ]
        );
        assert_eq!(board.count_cards().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_delay_elapses() {
        let config = GameConfig {
            placement_delay_millis: 250,
            ..GameConfig::default()
        };
        let board = Board::new(&config, Arc::new(crate::ui::NullUi));
        let start = tokio::time::Instant::now();
        board.lock().await.place_card(3, 3).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
        assert_eq!(board.snapshot_slots(&[3]).await, Some(vec![3]));
    }
}
