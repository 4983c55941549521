//! FIFO hand-off of set claims from players to the dealer.
//!
//! A player submits a claim and gets a [`ClaimTicket`]; the dealer drains
//! claims in arrival order and answers each one through that ticket's
//! one-shot channel. Nobody else sees the verdict.

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::{PlayerId, errors::ClaimError};

/// Dealer's answer to a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Claim was stale or the game ended; no freeze
    None,
    /// Legal set, point awarded
    Score,
    /// Not a set
    Penalty,
}

/// Waits for the verdict of one claim
#[derive(Debug)]
pub struct ClaimTicket {
    response: oneshot::Receiver<Verdict>,
}

impl ClaimTicket {
    /// Wait for the verdict. Resolves to [`Verdict::None`] if the queue is
    /// closed before the claim is judged.
    pub async fn verdict(self) -> Verdict {
        self.response.await.unwrap_or(Verdict::None)
    }
}

/// Claim queue shared by all players and the dealer
#[derive(Debug)]
pub struct ClaimQueue {
    sender: mpsc::UnboundedSender<PlayerId>,
    receiver: Mutex<mpsc::UnboundedReceiver<PlayerId>>,
    pending: Mutex<PendingClaims>,
}

#[derive(Debug, Default)]
struct PendingClaims {
    responders: HashMap<PlayerId, oneshot::Sender<Verdict>>,
    closed: bool,
}

impl Default for ClaimQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: Mutex::new(PendingClaims::default()),
        }
    }

    /// Enqueue a claim for `player`.
    ///
    /// A player has at most one claim in the queue; a second submission is
    /// refused and leaves the queue untouched.
    pub async fn submit(&self, player: PlayerId) -> Result<ClaimTicket, ClaimError> {
        let mut pending = self.pending.lock().await;
        if pending.closed {
            return Err(ClaimError::Closed);
        }
        if pending.responders.contains_key(&player) {
            return Err(ClaimError::AlreadyPending(player));
        }

        let (tx, rx) = oneshot::channel();
        // Sent while `pending` is held so queue order matches registration.
        self.sender.send(player).map_err(|_| ClaimError::Closed)?;
        pending.responders.insert(player, tx);
        log::debug!("player {} claims a set", player);

        Ok(ClaimTicket { response: rx })
    }

    /// Take every queued claim in arrival order.
    ///
    /// When the queue is empty, waits up to `max_wait` for the first claim and
    /// returns an empty list on timeout. Safe to cancel.
    pub async fn drain(&self, max_wait: Duration) -> Vec<PlayerId> {
        let mut receiver = self.receiver.lock().await;
        let mut claims = Vec::new();

        match receiver.try_recv() {
            Ok(player) => claims.push(player),
            Err(_) => match tokio::time::timeout(max_wait, receiver.recv()).await {
                Ok(Some(player)) => claims.push(player),
                Ok(None) | Err(_) => return claims,
            },
        }

        while let Ok(player) = receiver.try_recv() {
            claims.push(player);
        }
        claims
    }

    /// Deliver `verdict` to `player`'s pending claim.
    ///
    /// Returns false when there is no pending claim, which includes a claim
    /// that has already been answered.
    pub async fn post_verdict(&self, player: PlayerId, verdict: Verdict) -> bool {
        let Some(responder) = self.pending.lock().await.responders.remove(&player) else {
            return false;
        };
        log::debug!("verdict for player {}: {:?}", player, verdict);
        // The player may have stopped waiting; the claim is still answered.
        let _ = responder.send(verdict);
        true
    }

    /// Refuse new claims and release every waiting player with
    /// [`Verdict::None`]
    pub async fn close(&self) {
        let mut pending = self.pending.lock().await;
        pending.closed = true;
        pending.responders.clear();
    }

    pub async fn is_closed(&self) -> bool {
        self.pending.lock().await.closed
    }

    /// Number of claims still waiting for a verdict
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.responders.len()
    }
}
