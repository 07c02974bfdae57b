//! Where engine-managed artifacts live inside a library.
//!
//! ```text
//! <library root>/
//!   .tankobon/
//!     series/<series id>/
//!       cover.jpg
//!       previews/<archive file name>.jpg
//!   <series folder>/...
//! ```
//!
//! All paths returned here are relative to the library root.

use std::path::PathBuf;

/// Reserved top-level folder. Never a series.
pub const ARTIFACTS_DIR: &str = ".tankobon";

/// Everything generated for one series. Removing it removes all of them.
pub fn series_dir(series_id: i64) -> PathBuf {
    PathBuf::from(ARTIFACTS_DIR).join("series").join(series_id.to_string())
}

pub fn previews_dir(series_id: i64) -> PathBuf {
    series_dir(series_id).join("previews")
}

/// Preview thumbnail for one archive, keyed by its file name.
pub fn preview_path(series_id: i64, file_name: &str) -> PathBuf {
    previews_dir(series_id).join(format!("{file_name}.jpg"))
}

pub fn cover_path(series_id: i64) -> PathBuf {
    series_dir(series_id).join("cover.jpg")
}
