use crate::error::Error;
use std::path::PathBuf;
use time::UtcDateTime;

/// A directory tree of series folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub id: i64,
    pub name: String,
    /// Absolute path to the library root.
    pub root_path: PathBuf,
    pub created_at: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct LibraryRow {
    id: i64,
    name: String,
    root_path: String,
    created_at: i64,
}
impl TryFrom<LibraryRow> for Library {
    type Error = Error;
    fn try_from(row: LibraryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            root_path: PathBuf::from(row.root_path),
            created_at: super::timestamp(row.created_at, "library creation date")?,
        })
    }
}
