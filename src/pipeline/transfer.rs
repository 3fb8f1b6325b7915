//! Transfer driver: starts a service-side copy and polls it to a terminal
//! state.
//!
//! ```text
//! NotStarted ──start──▶ Pending ──poll──▶ Pending
//!                          │
//!                          ├──▶ Success
//!                          ├──▶ Failed
//!                          └──▶ Aborted
//! ```
//!
//! Transitions are computed by [`TransferState::advance`] from each observed
//! [`CopyState`], independently of how the driver waits between polls.

use crate::{
    models::{
        copy::{CopyState, CopyStatus},
        grant::SignedAccessGrant,
        object::ObjectReference,
    },
    pipeline::progress::ProgressObserver,
    services::blob_service::BlobService,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay between copy-status polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Source of the delay between polls.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time, via the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    NotStarted,
    Pending {
        bytes_copied: u64,
        total_bytes: Option<u64>,
    },
    Success,
    Failed {
        reason: String,
    },
    Aborted {
        reason: String,
    },
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Success | TransferState::Failed { .. } | TransferState::Aborted { .. }
        )
    }

    /// Apply one observation of the service's copy status.
    ///
    /// Terminal states absorb further observations. While pending, bytes
    /// copied never decrease and a known total is kept once seen.
    pub fn advance(self, observed: &CopyState) -> Self {
        if self.is_terminal() {
            return self;
        }
        let (previous_bytes, previous_total) = match self {
            TransferState::Pending {
                bytes_copied,
                total_bytes,
            } => (bytes_copied, total_bytes),
            _ => (0, None),
        };

        match observed.status {
            CopyStatus::Pending => TransferState::Pending {
                bytes_copied: previous_bytes.max(observed.bytes_copied.unwrap_or(0)),
                total_bytes: observed.total_bytes.or(previous_total),
            },
            CopyStatus::Success => TransferState::Success,
            CopyStatus::Failed => TransferState::Failed {
                reason: describe(observed, "copy failed"),
            },
            CopyStatus::Aborted => TransferState::Aborted {
                reason: describe(observed, "copy aborted"),
            },
        }
    }

    /// Move a non-terminal state to `Failed`.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        if self.is_terminal() {
            self
        } else {
            TransferState::Failed {
                reason: reason.into(),
            }
        }
    }

    /// The terminal outcome, or `None` while the copy is still in flight.
    pub fn outcome(&self) -> Option<TransferOutcome> {
        match self {
            TransferState::Success => Some(TransferOutcome::Success),
            TransferState::Failed { reason } => Some(TransferOutcome::Failed(reason.clone())),
            TransferState::Aborted { reason } => Some(TransferOutcome::Aborted(reason.clone())),
            TransferState::NotStarted | TransferState::Pending { .. } => None,
        }
    }
}

fn describe(observed: &CopyState, fallback: &str) -> String {
    observed
        .status_description
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    Failed(String),
    Aborted(String),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success)
    }
}

/// One selected blob on its way to the destination container.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub source: ObjectReference,
    pub destination_container: String,
    pub state: TransferState,
}

impl TransferTask {
    pub fn new(source: ObjectReference, destination_container: impl Into<String>) -> Self {
        Self {
            source,
            destination_container: destination_container.into(),
            state: TransferState::NotStarted,
        }
    }

    fn apply(&mut self, observed: &CopyState) {
        let state = std::mem::replace(&mut self.state, TransferState::NotStarted);
        self.state = state.advance(observed);
    }

    fn fail(&mut self, reason: String) {
        let state = std::mem::replace(&mut self.state, TransferState::NotStarted);
        self.state = state.fail(reason);
    }
}

/// Drives a single copy on the destination service.
pub struct TransferDriver<'a> {
    destination: &'a dyn BlobService,
    clock: &'a dyn Clock,
    observer: &'a dyn ProgressObserver,
}

impl<'a> TransferDriver<'a> {
    pub fn new(
        destination: &'a dyn BlobService,
        clock: &'a dyn Clock,
        observer: &'a dyn ProgressObserver,
    ) -> Self {
        Self {
            destination,
            clock,
            observer,
        }
    }

    /// Copy `task.source` to the destination using `grant` and wait for a
    /// terminal state.
    ///
    /// `known_total`, when given, replaces the service-reported total in
    /// progress lines. Initiation or poll errors end the transfer as
    /// `Failed`; nothing here aborts the run.
    pub async fn drive(
        &self,
        task: &mut TransferTask,
        grant: &SignedAccessGrant,
        known_total: Option<u64>,
    ) -> TransferOutcome {
        let name = task.source.name.clone();

        match self
            .destination
            .start_copy_from_uri(&task.destination_container, &name, &grant.uri)
            .await
        {
            Ok(initial) => {
                debug!(name = %name, copy_id = %initial.copy_id, status = %initial.status, "copy started");
                task.apply(&initial);
            }
            Err(err) => {
                warn!(name = %name, error = %err, "copy could not be started");
                task.fail(err.to_string());
            }
        }

        loop {
            if let Some(outcome) = task.state.outcome() {
                return outcome;
            }
            if let TransferState::Pending {
                bytes_copied,
                total_bytes,
            } = &task.state
            {
                let total = known_total.or(*total_bytes).unwrap_or(0);
                self.observer.copy_progress(&name, *bytes_copied, total);
            }

            self.clock.sleep(POLL_INTERVAL).await;

            match self
                .destination
                .get_copy_state(&task.destination_container, &name)
                .await
            {
                Ok(observed) => task.apply(&observed),
                Err(err) => {
                    warn!(name = %name, error = %err, "copy status poll failed");
                    task.fail(err.to_string());
                }
            }
        }
    }
}
