//! The library scan engine.
//!
//! A library is a folder of series folders full of comic archives. Scanning
//! one keeps the catalog in step with the disk: new series get metadata and a
//! cover, new archives get a page count and a preview, and anything that
//! vanished from disk vanishes from the catalog.
//!
//! Scans run in the background, one per library at a time, reporting
//! progress through a shared [`ScanTracker`].

pub mod error;
mod manage;
mod scan;
mod tracker;

pub use crate::manage::{add_library, remove_library};
pub use crate::scan::{DEFAULT_METADATA_COOLDOWN, ScanStarted, Scanner};
pub use crate::tracker::{Progress, ScanSnapshot, ScanTracker, SeriesProgress, SeriesState};
