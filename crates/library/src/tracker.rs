//! Live scan progress, per library.
//!
//! Held in memory only. A restart forgets every scan, finished or not, and
//! nothing is ever resumed.

use std::collections::HashMap;
use time::UtcDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesState {
    Scanning,
    Complete,
    Error,
}

/// Files handled so far out of the archives found in the series folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesProgress {
    /// Folder name, which is also the series title.
    pub name: String,
    pub state: SeriesState,
    pub progress: Option<Progress>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScanStatus {
    in_progress: bool,
    start_time: UtcDateTime,
    total_series: usize,
    completed_series: usize,
    series: Vec<SeriesProgress>,
}
impl ScanStatus {
    fn series_mut(&mut self, name: &str) -> Option<&mut SeriesProgress> {
        self.series.iter_mut().find(|s| s.name == name)
    }
}

/// A point-in-time copy of a library's scan status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSnapshot {
    pub in_progress: bool,
    pub start_time: UtcDateTime,
    pub total_series: usize,
    /// Series that finished without error.
    pub completed_series: usize,
    pub series: Vec<SeriesProgress>,
    /// Names still marked as scanning.
    pub remaining: Vec<String>,
}

/// Owns the status of every scan this process has started.
///
/// Updates for a library or series the tracker doesn't know about are
/// ignored. Nothing here awaits anything but the lock itself.
#[derive(Debug, Default)]
pub struct ScanTracker {
    scans: RwLock<HashMap<i64, ScanStatus>>,
}
impl ScanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a scan over `series`, replacing whatever finished scan
    /// was there before. Returns `false`, changing nothing, if a scan of the
    /// library is still in progress.
    pub async fn try_begin(&self, library_id: i64, series: &[String]) -> bool {
        let mut scans = self.scans.write().await;
        if scans.get(&library_id).is_some_and(|s| s.in_progress) {
            return false;
        }
        scans.insert(library_id, ScanStatus {
            in_progress: true,
            start_time: UtcDateTime::now(),
            total_series: series.len(),
            completed_series: 0,
            series: series
                .iter()
                .map(|name| SeriesProgress {
                    name: name.clone(),
                    state: SeriesState::Scanning,
                    progress: None,
                    error: None,
                })
                .collect(),
        });
        true
    }

    pub async fn is_scanning(&self, library_id: i64) -> bool {
        self.scans.read().await.get(&library_id).is_some_and(|s| s.in_progress)
    }

    async fn update(&self, library_id: i64, name: &str, f: impl FnOnce(&mut SeriesProgress)) {
        let mut scans = self.scans.write().await;
        if let Some(series) = scans.get_mut(&library_id).and_then(|s| s.series_mut(name)) {
            f(series);
        }
    }

    pub async fn mark_scanning(&self, library_id: i64, name: &str) {
        self.update(library_id, name, |s| s.state = SeriesState::Scanning).await;
    }

    pub async fn set_progress(&self, library_id: i64, name: &str, current: usize, total: usize) {
        self.update(library_id, name, |s| s.progress = Some(Progress { current, total })).await;
    }

    pub async fn mark_complete(&self, library_id: i64, name: &str) {
        let mut scans = self.scans.write().await;
        let Some(status) = scans.get_mut(&library_id) else {
            return;
        };
        if let Some(series) = status.series_mut(name) {
            series.state = SeriesState::Complete;
            series.error = None;
            status.completed_series += 1;
        }
    }

    pub async fn mark_error(&self, library_id: i64, name: &str, error: impl Into<String>) {
        let error = error.into();
        self.update(library_id, name, |s| {
            s.state = SeriesState::Error;
            s.error = Some(error);
        })
        .await;
    }

    /// The scan is over, however it ended. The status sticks around for
    /// readers until the next scan of the same library.
    pub async fn finish(&self, library_id: i64) {
        if let Some(status) = self.scans.write().await.get_mut(&library_id) {
            status.in_progress = false;
        }
    }

    /// `None` if no scan of this library has run since startup.
    pub async fn snapshot(&self, library_id: i64) -> Option<ScanSnapshot> {
        let scans = self.scans.read().await;
        let status = scans.get(&library_id)?;
        Some(ScanSnapshot {
            in_progress: status.in_progress,
            start_time: status.start_time,
            total_series: status.total_series,
            completed_series: status.completed_series,
            series: status.series.clone(),
            remaining: status
                .series
                .iter()
                .filter(|s| s.state == SeriesState::Scanning)
                .map(|s| s.name.clone())
                .collect(),
        })
    }
}
