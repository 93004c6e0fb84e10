//! Background sync handles and request sequencing.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tracing::warn;

/// How an optimistic mutation ended up on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// No server call was made (logged out, or nothing to send).
    LocalOnly,
    /// The server accepted the change.
    Confirmed,
    /// The server call failed and the local change was undone.
    RolledBack,
    /// The server call failed but newer local changes were kept.
    Superseded,
    /// The sync task was cancelled or panicked before settling.
    Aborted,
}

impl SyncOutcome {
    /// Whether the local state matches what was sent.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::LocalOnly | Self::Confirmed)
    }
}

/// Handle on the server call behind an optimistic mutation.
///
/// The local state has already changed when the handle is returned.
/// Dropping the handle lets the sync finish in the background.
#[derive(Debug)]
#[must_use = "drop the handle explicitly to run the sync in the background"]
pub struct SyncHandle {
    task: Option<JoinHandle<SyncOutcome>>,
}

impl SyncHandle {
    /// A mutation that never leaves the client.
    pub(crate) const fn local() -> Self {
        Self { task: None }
    }

    /// Run `sync` on the runtime.
    pub(crate) fn spawn<F>(sync: F) -> Self
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(sync)),
        }
    }

    /// Whether a server call was started.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for the server call to settle.
    pub async fn outcome(self) -> SyncOutcome {
        let Some(task) = self.task else {
            return SyncOutcome::LocalOnly;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Cart sync task did not complete");
                SyncOutcome::Aborted
            }
        }
    }
}

/// Issues increasing tickets; only the newest ticket may apply its result.
#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    latest: AtomicU64,
}

impl Sequencer {
    /// Start a new request, superseding every earlier one.
    pub(crate) fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ticket` is still the newest.
    pub(crate) fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }

    /// Give back `ticket` after its request failed, so the request it
    /// superseded may apply again. A no-op once a newer ticket was issued.
    pub(crate) fn withdraw(&self, ticket: u64) {
        let _ = self.latest.compare_exchange(
            ticket,
            ticket.saturating_sub(1),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}
