//! User interface seam.
//!
//! The engine reports every visible change through [`Ui`] and never reads
//! anything back. Calls are made while engine locks are held, so
//! implementations must return quickly.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{CardId, PlayerId, Slot};

/// Fire-and-forget rendering callbacks
pub trait Ui: Send + Sync {
    fn show_card(&self, card: CardId, slot: Slot);
    fn hide_card(&self, slot: Slot);
    fn show_token(&self, player: PlayerId, slot: Slot);
    fn hide_token(&self, player: PlayerId, slot: Slot);
    fn hide_all_tokens(&self, slot: Slot);
    fn set_score(&self, player: PlayerId, score: u32);
    fn set_freeze(&self, player: PlayerId, remaining_millis: u64);
    fn set_countdown(&self, remaining_millis: u64, warning: bool);
    fn announce_winners(&self, players: &[PlayerId]);
}

/// One UI callback, as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    ShowCard { card: CardId, slot: Slot },
    HideCard { slot: Slot },
    ShowToken { player: PlayerId, slot: Slot },
    HideToken { player: PlayerId, slot: Slot },
    HideAllTokens { slot: Slot },
    Score { player: PlayerId, score: u32 },
    Freeze { player: PlayerId, remaining_millis: u64 },
    Countdown { remaining_millis: u64, warning: bool },
    Winners { players: Vec<PlayerId> },
}

/// Forwards every callback as a [`UiEvent`] into a channel
#[derive(Debug, Clone)]
pub struct ChannelUi {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelUi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn emit(&self, event: UiEvent) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.sender.send(event);
    }
}

impl Ui for ChannelUi {
    fn show_card(&self, card: CardId, slot: Slot) {
        self.emit(UiEvent::ShowCard { card, slot });
    }

    fn hide_card(&self, slot: Slot) {
        self.emit(UiEvent::HideCard { slot });
    }

    fn show_token(&self, player: PlayerId, slot: Slot) {
        self.emit(UiEvent::ShowToken { player, slot });
    }

    fn hide_token(&self, player: PlayerId, slot: Slot) {
        self.emit(UiEvent::HideToken { player, slot });
    }

    fn hide_all_tokens(&self, slot: Slot) {
        self.emit(UiEvent::HideAllTokens { slot });
    }

    fn set_score(&self, player: PlayerId, score: u32) {
        self.emit(UiEvent::Score { player, score });
    }

    fn set_freeze(&self, player: PlayerId, remaining_millis: u64) {
        self.emit(UiEvent::Freeze {
            player,
            remaining_millis,
        });
    }

    fn set_countdown(&self, remaining_millis: u64, warning: bool) {
        self.emit(UiEvent::Countdown {
            remaining_millis,
            warning,
        });
    }

    fn announce_winners(&self, players: &[PlayerId]) {
        self.emit(UiEvent::Winners {
            players: players.to_vec(),
        });
    }
}

/// Renders to the `log` facade. Countdown and freeze ticks go to `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogUi;

impl Ui for LogUi {
    fn show_card(&self, card: CardId, slot: Slot) {
        log::debug!("card {} placed on slot {}", card, slot);
    }

    fn hide_card(&self, slot: Slot) {
        log::debug!("slot {} cleared", slot);
    }

    fn show_token(&self, player: PlayerId, slot: Slot) {
        log::debug!("player {} token on slot {}", player, slot);
    }

    fn hide_token(&self, player: PlayerId, slot: Slot) {
        log::debug!("player {} token off slot {}", player, slot);
    }

    fn hide_all_tokens(&self, slot: Slot) {
        log::debug!("all tokens off slot {}", slot);
    }

    fn set_score(&self, player: PlayerId, score: u32) {
        log::info!("player {} scores, now at {}", player, score);
    }

    fn set_freeze(&self, player: PlayerId, remaining_millis: u64) {
        log::trace!("player {} frozen for {}ms", player, remaining_millis);
    }

    fn set_countdown(&self, remaining_millis: u64, warning: bool) {
        if warning {
            log::trace!("countdown {}ms (warning)", remaining_millis);
        } else {
            log::trace!("countdown {}ms", remaining_millis);
        }
    }

    fn announce_winners(&self, players: &[PlayerId]) {
        log::info!("winners: {:?}", players);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUi;

impl Ui for NullUi {
    fn show_card(&self, _card: CardId, _slot: Slot) {}
    fn hide_card(&self, _slot: Slot) {}
    fn show_token(&self, _player: PlayerId, _slot: Slot) {}
    fn hide_token(&self, _player: PlayerId, _slot: Slot) {}
    fn hide_all_tokens(&self, _slot: Slot) {}
    fn set_score(&self, _player: PlayerId, _score: u32) {}
    fn set_freeze(&self, _player: PlayerId, _remaining_millis: u64) {}
    fn set_countdown(&self, _remaining_millis: u64, _warning: bool) {}
    fn announce_winners(&self, _players: &[PlayerId]) {}
}
