//! Random key presses for computer players.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{PlayerId, Slot, input::InputSender, termination::TerminationSignal};

/// Presses a uniformly random slot every think interval.
///
/// Unlike external key presses, simulated presses wait for room in the
/// player's queue instead of being dropped.
#[derive(Debug)]
pub struct SimulatedInput {
    sender: InputSender,
    table_size: usize,
    think: Duration,
    rng: StdRng,
}

impl SimulatedInput {
    pub fn new(sender: InputSender, table_size: usize, think: Duration) -> Self {
        Self {
            sender,
            table_size,
            think,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a fixed seed so the press sequence is reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn player(&self) -> PlayerId {
        self.sender.player()
    }

    pub fn next_slot(&mut self) -> Slot {
        self.rng.random_range(0..self.table_size)
    }

    pub async fn run(mut self, stop: TerminationSignal) {
        let player = self.player();
        log::info!("simulated input for player {} starting", player);

        loop {
            tokio::select! {
                biased;
                _ = stop.terminated() => break,
                _ = tokio::time::sleep(self.think) => {}
            }

            let slot = self.next_slot();
            tokio::select! {
                biased;
                _ = stop.terminated() => break,
                pushed = self.sender.push(slot) => {
                    if pushed.is_err() {
                        break;
                    }
                }
            }
        }

        log::info!("simulated input for player {} terminated", player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{input::action_queue, termination::Terminator};

    #[test]
    fn test_seeded_sequences_repeat() {
        let (sender, _receiver) = action_queue(0, 12, 3);
        let mut a = SimulatedInput::new(sender.clone(), 12, Duration::ZERO).with_seed(7);
        let mut b = SimulatedInput::new(sender, 12, Duration::ZERO).with_seed(7);
        let first: Vec<Slot> = (0..50).map(|_| a.next_slot()).collect();
        let second: Vec<Slot> = (0..50).map(|_| b.next_slot()).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|&slot| slot < 12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fills_queue_then_waits() {
        let (sender, mut receiver) = action_queue(1, 12, 3);
        let terminator = Terminator::new();
        let input = SimulatedInput::new(sender, 12, Duration::from_millis(20)).with_seed(1);
        let task = tokio::spawn(input.run(terminator.signal()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        // Three queued presses, the fourth is blocked on the full queue
        let mut queued = 0;
        while receiver.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, 3);

        terminator.terminate();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_terminated_while_blocked() {
        let (sender, _receiver) = action_queue(0, 12, 1);
        let terminator = Terminator::new();
        let task = tokio::spawn(
            SimulatedInput::new(sender, 12, Duration::from_millis(1)).run(terminator.signal()),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        terminator.terminate();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("simulated input did not stop")
            .unwrap();
    }
}
