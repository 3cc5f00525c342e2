use std::sync::Arc;

use sorter_core::{ControlCommand, ControlSignal, RunPhase};
use sorter_logging::sorter_info;
use tokio::sync::watch;

/// Shared handle to the run's [`ControlSignal`].
///
/// Writers (signal handler, console listener) call [`RunController::apply`];
/// the pipeline reads at item boundaries and parks on
/// [`RunController::wait_until_runnable`] while paused.
#[derive(Debug, Clone)]
pub struct RunController {
    tx: Arc<watch::Sender<ControlSignal>>,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlSignal::new());
        Self { tx: Arc::new(tx) }
    }

    /// Apply a command; returns the resulting signal.
    pub fn apply(&self, command: ControlCommand) -> ControlSignal {
        self.tx.send_if_modified(|signal| {
            let next = signal.apply(command);
            let changed = next != *signal;
            *signal = next;
            changed
        });
        let current = self.signal();
        sorter_info!("control {:?} -> {:?}", command, current.phase());
        current
    }

    pub fn pause(&self) -> ControlSignal {
        self.apply(ControlCommand::Pause)
    }

    pub fn resume(&self) -> ControlSignal {
        self.apply(ControlCommand::Resume)
    }

    pub fn request_stop(&self) -> ControlSignal {
        self.apply(ControlCommand::Stop)
    }

    pub fn signal(&self) -> ControlSignal {
        *self.tx.borrow()
    }

    pub fn phase(&self) -> RunPhase {
        self.signal().phase()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.signal().stop_requested()
    }

    /// Returns immediately unless paused; otherwise parks until resumed or
    /// stopped. The returned phase is never `Paused`.
    pub async fn wait_until_runnable(&self) -> RunPhase {
        let mut rx = self.tx.subscribe();
        let result = rx
            .wait_for(|signal| signal.phase() != RunPhase::Paused)
            .await
            .map(|signal| signal.phase());
        // The sender lives as long as `self`, so the channel cannot close here.
        result.unwrap_or(RunPhase::Stopping)
    }
}
