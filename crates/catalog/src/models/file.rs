use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::path::PathBuf;
use tankobon_extract::models::FileFormat;
use time::UtcDateTime;

/// An archive inside a series folder.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: i64,
    pub series_id: i64,
    /// Absolute path to the archive.
    pub path: PathBuf,
    pub file_name: String,
    pub file_format: FileFormat,
    /// Zero when the file name didn't say.
    pub volume: u32,
    /// Zero when the file name didn't say.
    pub chapter: f32,
    pub total_pages: u32,
    pub current_page: u32,
    pub is_read: bool,
    pub discovered_at: UtcDateTime,
}

/// An archive found on disk that isn't in the catalog yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFile {
    pub path: PathBuf,
    pub file_name: String,
    pub file_format: FileFormat,
    pub volume: u32,
    pub chapter: f32,
    pub total_pages: u32,
}

/// What [`apply_file_changes`](crate::Repository::apply_file_changes) did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileChanges {
    /// How many rows were actually deleted.
    pub deleted: u64,
    pub created: Vec<File>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    id: i64,
    series_id: i64,
    path: String,
    file_name: String,
    file_format: String,
    volume: i64,
    chapter: f64,
    total_pages: i64,
    current_page: i64,
    is_read: bool,
    discovered_at: i64,
}
impl TryFrom<FileRow> for File {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            series_id: row.series_id,
            path: PathBuf::from(row.path),
            file_name: row.file_name,
            file_format: row.file_format.parse::<FileFormat>().or_raise(|| ErrorKind::InvalidData("file format"))?,
            volume: super::unsigned(row.volume, "volume")?,
            chapter: row.chapter as f32,
            total_pages: super::unsigned(row.total_pages, "total pages")?,
            current_page: super::unsigned(row.current_page, "current page")?,
            is_read: row.is_read,
            discovered_at: super::timestamp(row.discovered_at, "discovery date")?,
        })
    }
}
