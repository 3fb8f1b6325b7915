//! The migration pipeline.
//!
//! A run is two explicit passes over the source container:
//!
//! 1. [`Migrator::select`] lists the container, fetches fresh properties
//!    for every blob and materialises the matching references.
//! 2. [`Migrator::migrate`] walks that list one blob at a time: mint a read
//!    grant, drive the service-side copy to a terminal state, and delete the
//!    source only when the copy succeeded.
//!
//! Blobs created or deleted in the source after selection are not
//! reconsidered.

pub mod enumerate;
pub mod grant;
pub mod progress;
pub mod reclaim;
pub mod select;
pub mod transfer;

use crate::{
    errors::{MoveError, MoveResult},
    models::object::ObjectReference,
    pipeline::{
        enumerate::DEFAULT_PAGE_SIZE,
        grant::mint_read_grant,
        progress::{LineProgress, ProgressObserver},
        reclaim::{ReclaimOutcome, reclaim_source},
        select::{SelectionCriterion, SelectionMode, select_blobs},
        transfer::{Clock, TokioClock, TransferDriver, TransferOutcome, TransferTask},
    },
    services::blob_service::BlobService,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// The two pipeline flavours. They differ in selection direction, container
/// bootstrap and where the progress total comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Moves blobs *not* modified since the cutoff. Containers must exist.
    Archive,
    /// Moves blobs modified since the cutoff. Creates missing containers.
    Transfer,
}

impl Variant {
    pub fn selection_mode(self) -> SelectionMode {
        match self {
            Variant::Archive => SelectionMode::NotModifiedSince,
            Variant::Transfer => SelectionMode::ModifiedSince,
        }
    }

    pub fn creates_containers(self) -> bool {
        matches!(self, Variant::Transfer)
    }

    /// First line printed by a run.
    pub fn banner(self, cutoff: DateTime<Utc>) -> String {
        format!("Moving blobs {} {}", self.selection_mode(), cutoff.to_rfc3339())
    }
}

/// What happened to each selected blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Copied, and the source is gone.
    pub moved: Vec<String>,
    /// Subset of `moved` whose source was already deleted by someone else.
    pub already_absent: Vec<String>,
    /// Copy ended failed or aborted; source left in place.
    pub copy_failed: Vec<String>,
    /// Copied, but the source could not be deleted.
    pub reclaim_failed: Vec<String>,
}

/// A source and a destination container, each behind its own service.
pub struct Endpoints {
    pub source: Arc<dyn BlobService>,
    pub source_container: String,
    pub destination: Arc<dyn BlobService>,
    pub destination_container: String,
}

pub struct Migrator {
    endpoints: Endpoints,
    variant: Variant,
    page_size: usize,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn ProgressObserver>,
}

impl Migrator {
    /// A migrator printing progress to stdout and sleeping on the tokio
    /// timer.
    pub fn new(endpoints: Endpoints, variant: Variant) -> Self {
        Self {
            endpoints,
            variant,
            page_size: DEFAULT_PAGE_SIZE,
            clock: Arc::new(TokioClock),
            observer: Arc::new(LineProgress::stdout()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn criterion(&self, cutoff: DateTime<Utc>) -> SelectionCriterion {
        SelectionCriterion::new(cutoff, self.variant.selection_mode())
    }

    /// Create the source and destination containers if the variant calls
    /// for it. A no-op for [`Variant::Archive`].
    pub async fn prepare(&self) -> MoveResult<()> {
        if !self.variant.creates_containers() {
            return Ok(());
        }
        for (service, container) in [
            (&self.endpoints.source, &self.endpoints.source_container),
            (&self.endpoints.destination, &self.endpoints.destination_container),
        ] {
            service
                .create_container_if_not_exists(container)
                .await
                .map_err(|source| MoveError::Prepare {
                    container: container.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// First pass: every blob in the source container that matches
    /// `criterion`.
    pub async fn select(&self, criterion: &SelectionCriterion) -> MoveResult<Vec<ObjectReference>> {
        let container = &self.endpoints.source_container;
        select_blobs(
            self.endpoints.source.as_ref(),
            container,
            criterion,
            self.page_size,
        )
        .await
        .map_err(|source| MoveError::Selection {
            container: container.clone(),
            source,
        })
    }

    /// Second pass: move `selected` one blob at a time.
    ///
    /// A failed copy leaves its source untouched and the run continues.
    /// Property-fetch and grant-minting failures end the run; blobs already
    /// handled stay as they are.
    pub async fn migrate(&self, selected: Vec<ObjectReference>) -> MoveResult<MigrationReport> {
        let source = self.endpoints.source.as_ref();
        let driver = TransferDriver::new(
            self.endpoints.destination.as_ref(),
            self.clock.as_ref(),
            self.observer.as_ref(),
        );
        let mut report = MigrationReport::default();

        for object in selected {
            let known_total = match self.variant {
                Variant::Transfer => Some(
                    source
                        .get_properties(&object.container, &object.name)
                        .await
                        .map_err(|err| MoveError::Properties {
                            name: object.name.clone(),
                            source: err,
                        })?
                        .size_bytes,
                ),
                Variant::Archive => None,
            };

            let grant = mint_read_grant(source, &object, Utc::now())?;
            let mut task = TransferTask::new(object, &self.endpoints.destination_container);
            let outcome = driver.drive(&mut task, &grant, known_total).await;
            let name = task.source.name.clone();

            match outcome {
                TransferOutcome::Success => {
                    self.observer.copy_completed(&name);
                    match reclaim_source(source, &task.source).await {
                        ReclaimOutcome::Deleted => report.moved.push(name),
                        ReclaimOutcome::AlreadyAbsent => {
                            report.already_absent.push(name.clone());
                            report.moved.push(name);
                        }
                        ReclaimOutcome::Failed(err) => {
                            self.observer.reclaim_failed(&name, &err.to_string());
                            report.reclaim_failed.push(name);
                        }
                    }
                }
                TransferOutcome::Failed(reason) | TransferOutcome::Aborted(reason) => {
                    warn!(name = %name, reason = %reason, "copy did not succeed, source kept");
                    self.observer.copy_failed(&name, &reason);
                    report.copy_failed.push(name);
                }
            }
        }

        Ok(report)
    }

    /// Prepare, select with the variant's mode, then migrate.
    pub async fn run(&self, cutoff: DateTime<Utc>) -> MoveResult<MigrationReport> {
        self.prepare().await?;
        let criterion = self.criterion(cutoff);
        let selected = self.select(&criterion).await?;
        info!(
            variant = ?self.variant,
            selected = selected.len(),
            "starting transfers"
        );

        let report = self.migrate(selected).await?;
        info!(
            moved = report.moved.len(),
            already_absent = report.already_absent.len(),
            copy_failed = report.copy_failed.len(),
            reclaim_failed = report.reclaim_failed.len(),
            "migration finished"
        );
        Ok(report)
    }
}
