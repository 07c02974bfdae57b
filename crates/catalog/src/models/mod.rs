mod file;
mod library;
mod series;

pub use self::file::{File, FileChanges, NewFile};
pub(crate) use self::file::FileRow;
pub use self::library::Library;
pub(crate) use self::library::LibraryRow;
pub use self::series::{NewSeries, Series};
pub(crate) use self::series::{SeriesRow, metadata_to_json};

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use time::UtcDateTime;

pub(crate) fn path_to_string(path: impl AsRef<Path>) -> Result<String> {
    Ok(path.as_ref().to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
}

fn timestamp(seconds: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(seconds).or_raise(|| ErrorKind::InvalidData(field))
}

fn unsigned(value: i64, field: &'static str) -> Result<u32> {
    u32::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}
