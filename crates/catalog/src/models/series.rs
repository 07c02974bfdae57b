use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::path::PathBuf;
use tankobon_extract::models::MangaMetadata;
use time::UtcDateTime;

/// What's stored in the `metadata` column when there is no metadata.
pub(crate) const EMPTY_METADATA: &str = "{}";

/// One top-level folder of a library.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: i64,
    pub library_id: i64,
    /// The folder name.
    pub title: String,
    /// Absolute path to the series folder.
    pub root_path: PathBuf,
    /// Absolute path to the cached cover image, if one was downloaded.
    pub cover: Option<PathBuf>,
    /// Provider metadata, or `None` if the lookup failed or never happened.
    pub metadata: Option<MangaMetadata>,
    pub created_at: UtcDateTime,
}

/// A series that hasn't been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSeries {
    pub library_id: i64,
    pub title: String,
    pub root_path: PathBuf,
    pub metadata: Option<MangaMetadata>,
}

pub(crate) fn metadata_to_json(metadata: Option<&MangaMetadata>) -> Result<String> {
    match metadata {
        Some(metadata) => serde_json::to_string(metadata).or_raise(|| ErrorKind::InvalidData("series metadata")),
        None => Ok(EMPTY_METADATA.to_string()),
    }
}

fn metadata_from_json(json: &str) -> Result<Option<MangaMetadata>> {
    let json = json.trim();
    if json.is_empty() || json == EMPTY_METADATA {
        return Ok(None);
    }
    serde_json::from_str(json).map(Some).or_raise(|| ErrorKind::InvalidData("series metadata"))
}

#[derive(sqlx::FromRow)]
pub(crate) struct SeriesRow {
    id: i64,
    library_id: i64,
    title: String,
    root_path: String,
    cover: String,
    metadata: String,
    created_at: i64,
}
impl TryFrom<SeriesRow> for Series {
    type Error = Error;
    fn try_from(row: SeriesRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            library_id: row.library_id,
            title: row.title,
            root_path: PathBuf::from(row.root_path),
            cover: Some(row.cover).filter(|c| !c.is_empty()).map(PathBuf::from),
            metadata: metadata_from_json(&row.metadata)?,
            created_at: super::timestamp(row.created_at, "series creation date")?,
        })
    }
}
