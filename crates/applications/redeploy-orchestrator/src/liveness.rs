//! One-way "apply is still running" signal between the two redeploy tasks.
//!
//! The apply task owns an [`ApplySignal`]; the drain task holds an
//! [`ApplyLiveness`]. Dropping the signal (normal return, error or panic)
//! marks apply as finished, so drain can never wait on a dead apply.

use tokio::sync::watch;

/// Held by the apply task for as long as apply runs
#[derive(Debug)]
pub struct ApplySignal {
    tx: watch::Sender<bool>,
}

/// Non-blocking view of the apply task's liveness
#[derive(Debug, Clone)]
pub struct ApplyLiveness {
    rx: watch::Receiver<bool>,
}

/// Create a linked signal/liveness pair, starting in the running state
pub fn apply_liveness() -> (ApplySignal, ApplyLiveness) {
    let (tx, rx) = watch::channel(true);
    (ApplySignal { tx }, ApplyLiveness { rx })
}

impl ApplySignal {
    /// Mark apply as finished
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for ApplySignal {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}

impl ApplyLiveness {
    /// Whether apply is still running
    pub fn is_running(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once apply has finished
    pub async fn finished(&mut self) {
        // Err only when the sender is gone, which also means finished
        let _ = self.rx.wait_for(|running| !*running).await;
    }
}
