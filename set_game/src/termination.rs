//! Cooperative stop signal.
//!
//! A [`Terminator`] raises the flag once; every [`TerminationSignal`] made
//! from it sees the flag and is woken from `terminated().await`. Tasks put
//! `terminated()` in a `select!` next to every wait that could otherwise
//! block forever.

use std::sync::Arc;

use tokio::sync::watch;

/// Raises the stop flag
#[derive(Debug, Clone)]
pub struct Terminator {
    sender: Arc<watch::Sender<bool>>,
}

/// Observes the stop flag
#[derive(Debug, Clone)]
pub struct TerminationSignal {
    receiver: watch::Receiver<bool>,
}

impl Default for Terminator {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Raise the flag. Idempotent.
    pub fn terminate(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_terminated(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn signal(&self) -> TerminationSignal {
        TerminationSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl TerminationSignal {
    pub fn is_terminated(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the flag is raised, immediately if it already is
    pub async fn terminated(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any `Terminator` clone; if all of them
        // are gone the flag can never be raised, so keep waiting.
        if receiver.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
