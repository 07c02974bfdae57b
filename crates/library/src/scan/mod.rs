//! Library scanning.
//!
//! [`Scanner::start_scan`] lists a library's series folders, claims the
//! library in the [`ScanTracker`] and hands the actual work to a background
//! task. That task reconciles one series at a time, then sweeps out series
//! whose folders have disappeared.

pub(crate) mod error;
mod files;
mod series;
mod sweep;

use crate::error::{ErrorKind, Result};
use crate::tracker::{ScanSnapshot, ScanTracker};
use exn::{OptionExt, ResultExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tankobon_archive::Inspector;
use tankobon_catalog::{Library, Repository};
use tankobon_metadata::MetadataSource;
use tankobon_storage::LocalBackend;
use tokio::task::JoinHandle;
use tracing::{Instrument, instrument};

/// Pause after creating a series that came with metadata.
pub const DEFAULT_METADATA_COOLDOWN: Duration = Duration::from_secs(1);

/// A scan that has been accepted and is running in the background.
#[derive(Debug)]
pub struct ScanStarted {
    /// Series folders the scan will visit, in order.
    pub remaining: Vec<String>,
    /// Resolves when the scan is over. Dropping it doesn't stop the scan.
    pub handle: JoinHandle<()>,
}

/// Runs library scans. Cheap to clone; clones share the tracker.
#[derive(Clone)]
pub struct Scanner {
    repo: Repository,
    tracker: Arc<ScanTracker>,
    metadata: Arc<dyn MetadataSource>,
    inspector: Arc<Inspector>,
    cooldown: Duration,
}
impl Scanner {
    pub fn new(
        repo: Repository,
        tracker: Arc<ScanTracker>,
        metadata: Arc<dyn MetadataSource>,
        inspector: Inspector,
    ) -> Self {
        Self {
            repo,
            tracker,
            metadata,
            inspector: Arc::new(inspector),
            cooldown: DEFAULT_METADATA_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn tracker(&self) -> &Arc<ScanTracker> {
        &self.tracker
    }

    /// Kick off a scan of a library and return straight away.
    ///
    /// Fails with [`NotFound`](ErrorKind::NotFound) for an unknown library
    /// and [`AlreadyInProgress`](ErrorKind::AlreadyInProgress) if a scan of
    /// it is still running. Must be called from within a Tokio runtime.
    #[instrument(skip(self))]
    pub async fn start_scan(&self, library_id: i64) -> Result<ScanStarted> {
        let library = self
            .repo
            .get_library(library_id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::NotFound(library_id))?;
        // Saves listing a big library only to be turned away.
        if self.tracker.is_scanning(library_id).await {
            exn::bail!(ErrorKind::AlreadyInProgress(library_id));
        }
        let backend = LocalBackend::new(&library.root_path).or_raise(|| ErrorKind::Storage)?;
        let folders = backend.list_dirs().await.or_raise(|| ErrorKind::Storage)?;
        if !self.tracker.try_begin(library_id, &folders).await {
            exn::bail!(ErrorKind::AlreadyInProgress(library_id));
        }
        tracing::info!(library = %library.name, series = folders.len(), "Starting scan");

        let scanner = self.clone();
        let remaining = folders.clone();
        let span = tracing::info_span!("scan", library_id);
        let handle = tokio::spawn(
            async move {
                let outcome = AssertUnwindSafe(scanner.run(&backend, &library, &folders)).catch_unwind().await;
                if outcome.is_err() {
                    tracing::error!("Scan panicked");
                }
                scanner.tracker.finish(library_id).await;
            }
            .instrument(span),
        );
        Ok(ScanStarted { remaining, handle })
    }

    /// Progress of the current or most recent scan of a library.
    pub async fn status(&self, library_id: i64) -> Option<ScanSnapshot> {
        self.tracker.snapshot(library_id).await
    }

    async fn run(&self, backend: &LocalBackend, library: &Library, folders: &[String]) {
        let started = std::time::Instant::now();
        for (index, name) in folders.iter().enumerate() {
            tracing::info!(series = %name, position = index + 1, total = folders.len(), "Reconciling series");
            self.tracker.mark_scanning(library.id, name).await;
            match self.reconcile_series(backend, library, name).await {
                Ok(()) => self.tracker.mark_complete(library.id, name).await,
                Err(err) => {
                    tracing::warn!(series = %name, error = %*err, "Series failed");
                    self.tracker.mark_error(library.id, name, (*err).to_string()).await;
                },
            }
        }
        if let Err(err) = self.sweep(backend, library).await {
            tracing::warn!(error = %*err, "Sweep failed");
        }
        tracing::info!(elapsed = ?started.elapsed(), "Scan complete");
    }
}
