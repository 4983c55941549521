//! Per-player bounded action queue.
//!
//! Each player owns the receiving half. Two kinds of producers feed it:
//! key presses from outside, which are dropped when the queue is full, and
//! the simulated input task, which waits for room.

use tokio::sync::mpsc;

use crate::{PlayerId, Slot, errors::InputError};

/// Create the action queue for `player`. Capacity is one full set of
/// presses.
pub fn action_queue(
    player: PlayerId,
    table_size: usize,
    capacity: usize,
) -> (InputSender, mpsc::Receiver<Slot>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        InputSender {
            player,
            table_size,
            sender,
        },
        receiver,
    )
}

/// Producer side of a player's action queue
#[derive(Debug, Clone)]
pub struct InputSender {
    player: PlayerId,
    table_size: usize,
    sender: mpsc::Sender<Slot>,
}

impl InputSender {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Enqueue without waiting. A full queue drops the press.
    pub fn press(&self, slot: Slot) -> Result<(), InputError> {
        self.check_slot(slot)?;
        self.sender.try_send(slot).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                log::warn!("player {} input queue full, dropping press", self.player);
                InputError::QueueFull(self.player)
            }
            mpsc::error::TrySendError::Closed(_) => InputError::Closed(self.player),
        })
    }

    /// Enqueue, waiting while the queue is full
    pub async fn push(&self, slot: Slot) -> Result<(), InputError> {
        self.check_slot(slot)?;
        self.sender
            .send(slot)
            .await
            .map_err(|_| InputError::Closed(self.player))
    }

    fn check_slot(&self, slot: Slot) -> Result<(), InputError> {
        if slot >= self.table_size {
            return Err(InputError::InvalidSlot {
                player: self.player,
                slot,
            });
        }
        Ok(())
    }
}
