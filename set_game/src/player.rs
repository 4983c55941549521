//! Player task.
//!
//! A player pops slot presses off its action queue and toggles tokens on the
//! board. Once it holds a full set of tokens it submits a claim, waits for
//! the dealer's verdict and serves the resulting freeze. Presses that arrive
//! meanwhile stay queued.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::Instant};

use crate::{
    PlayerId, Slot,
    board::TokenToggle,
    claims::Verdict,
    errors::ClaimError,
    simulated::SimulatedInput,
    table::{Seat, Table},
    termination::{TerminationSignal, Terminator},
};

pub struct Player {
    seat: Arc<Seat>,
    table: Arc<Table>,
    actions: mpsc::Receiver<Slot>,
    companion: Option<SimulatedInput>,
}

/// A started player
#[derive(Debug)]
pub struct PlayerHandle {
    id: PlayerId,
    terminator: Terminator,
    task: JoinHandle<()>,
}

impl PlayerHandle {
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Terminate the player and wait until it and its simulated input have
    /// exited
    pub async fn stop(self) {
        self.terminator.terminate();
        if let Err(e) = self.task.await {
            log::error!("player {} task failed: {}", self.id, e);
        }
    }
}

impl Player {
    pub fn new(seat: Arc<Seat>, table: Arc<Table>, actions: mpsc::Receiver<Slot>) -> Self {
        Self {
            seat,
            table,
            actions,
            companion: None,
        }
    }

    /// Attach the simulated input that drives this player. It is started and
    /// stopped together with the player.
    pub fn with_companion(mut self, companion: SimulatedInput) -> Self {
        self.companion = Some(companion);
        self
    }

    pub fn id(&self) -> PlayerId {
        self.seat.id()
    }

    pub fn spawn(self) -> PlayerHandle {
        let terminator = Terminator::new();
        let id = self.id();
        let task = tokio::spawn(self.run(terminator.signal()));
        PlayerHandle {
            id,
            terminator,
            task,
        }
    }

    async fn run(mut self, stop: TerminationSignal) {
        let id = self.id();
        log::info!("player {} starting", id);

        let companion = self.companion.take().map(|input| {
            let terminator = Terminator::new();
            let task = tokio::spawn(input.run(terminator.signal()));
            (terminator, task)
        });

        loop {
            let slot = tokio::select! {
                biased;
                _ = stop.terminated() => break,
                slot = self.actions.recv() => match slot {
                    Some(slot) => slot,
                    None => {
                        // Every producer is gone; nothing left to do but wait.
                        stop.terminated().await;
                        break;
                    }
                },
            };

            if self.apply(slot).await < self.table.config.feature_size {
                continue;
            }

            let Some(verdict) = self.claim(&stop).await else {
                break;
            };
            if !self.serve(verdict, &stop).await {
                break;
            }
        }

        if let Some((terminator, task)) = companion {
            terminator.terminate();
            if let Err(e) = task.await {
                log::error!("simulated input for player {} failed: {}", id, e);
            }
        }
        log::info!("player {} terminated", id);
    }

    /// Toggle a token on `slot` and mirror the outcome into the selection.
    /// Returns the selection size.
    async fn apply(&self, slot: Slot) -> usize {
        let mut board = self.table.board.lock().await;
        let mut selection = self.seat.selection.lock().await;

        match board.toggle_token(self.id(), slot) {
            TokenToggle::Added => selection.push(slot),
            TokenToggle::Removed => selection.retain(|&s| s != slot),
            TokenToggle::Rejected => {}
        }
        selection.len()
    }

    /// Submit the current selection and wait for the verdict. `None` means
    /// the player should stop.
    async fn claim(&self, stop: &TerminationSignal) -> Option<Verdict> {
        let ticket = match self.table.claims.submit(self.id()).await {
            Ok(ticket) => ticket,
            Err(e @ ClaimError::AlreadyPending(_)) => {
                log::warn!("player {} claim refused: {}", self.id(), e);
                return Some(Verdict::None);
            }
            Err(ClaimError::Closed) => {
                // Claims close only when the game ends.
                stop.terminated().await;
                return None;
            }
        };

        tokio::select! {
            biased;
            _ = stop.terminated() => None,
            verdict = ticket.verdict() => Some(verdict),
        }
    }

    /// Apply a verdict. Returns false if terminated during the freeze.
    async fn serve(&self, verdict: Verdict, stop: &TerminationSignal) -> bool {
        let config = &self.table.config;
        match verdict {
            Verdict::Score => {
                let score = self.seat.add_point();
                self.table.ui.set_score(self.id(), score);
                self.freeze(config.point_freeze(), stop).await
            }
            Verdict::Penalty => self.freeze(config.penalty_freeze(), stop).await,
            Verdict::None => true,
        }
    }

    async fn freeze(&self, duration: Duration, stop: &TerminationSignal) -> bool {
        let until = Instant::now() + duration;
        let tick = self.table.config.freeze_tick();

        loop {
            let remaining = until.saturating_duration_since(Instant::now());
            self.table.ui.set_freeze(self.id(), millis(remaining));
            if remaining.is_zero() {
                return true;
            }

            tokio::select! {
                biased;
                _ = stop.terminated() => {
                    self.table.ui.set_freeze(self.id(), 0);
                    return false;
                }
                _ = tokio::time::sleep(remaining.min(tick)) => {}
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
