//! Repository for libraries, series and files.
//!
//! The repository is the only thing that writes catalog rows. Series belong
//! to a library and files belong to a series; deleting either parent cascades
//! in the database.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{
    File, FileChanges, FileRow, Library, LibraryRow, NewFile, NewSeries, Series, SeriesRow, metadata_to_json,
    path_to_string,
};
use exn::ResultExt;
use sqlx::SqlitePool;
use std::path::Path;
use tankobon_extract::models::MangaMetadata;
use time::UtcDateTime;
use tracing::instrument;

/// Map a failed write to [`ErrorKind::Conflict`] when it tripped a UNIQUE
/// constraint, and to [`ErrorKind::Database`] otherwise.
fn unique<T>(result: sqlx::Result<T>, what: impl FnOnce() -> String) -> Result<T> {
    let conflict = matches!(&result, Err(sqlx::Error::Database(e)) if e.is_unique_violation());
    if conflict {
        result.or_raise(|| ErrorKind::Conflict(what()))
    } else {
        result.or_raise(|| ErrorKind::Database)
    }
}

fn now() -> i64 {
    UtcDateTime::now().unix_timestamp()
}

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Libraries
    // =========================================================================

    /// Register a library. Fails with [`ErrorKind::Conflict`] if another
    /// library already uses the same root.
    #[instrument(skip_all, fields(name = name.as_ref(), root_path = %root_path.as_ref().display()))]
    pub async fn create_library(&self, name: impl AsRef<str>, root_path: impl AsRef<Path>) -> Result<Library> {
        let root = path_to_string(&root_path)?;
        let result = sqlx::query_as::<_, LibraryRow>(include_str!("../queries/insert_library.sql"))
            .bind(name.as_ref())
            .bind(&root)
            .bind(now())
            .fetch_one(&self.pool)
            .await;
        unique(result, || format!("library at {root}"))?.try_into()
    }

    pub async fn get_library(&self, id: i64) -> Result<Option<Library>> {
        let row: Option<LibraryRow> = sqlx::query_as(include_str!("../queries/get_library.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Library::try_from).transpose()
    }

    pub async fn list_libraries(&self) -> Result<Vec<Library>> {
        let rows: Vec<LibraryRow> = sqlx::query_as(include_str!("../queries/list_libraries.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Library::try_from).collect()
    }

    /// Delete a library along with all of its series and files.
    ///
    /// Returns `false` if there was no such library.
    #[instrument(skip(self))]
    pub async fn delete_library(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_library.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Series
    // =========================================================================

    /// Look up a series by its folder name within a library.
    pub async fn find_series(&self, library_id: i64, title: impl AsRef<str>) -> Result<Option<Series>> {
        let row: Option<SeriesRow> = sqlx::query_as(include_str!("../queries/find_series.sql"))
            .bind(library_id)
            .bind(title.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Series::try_from).transpose()
    }

    pub async fn get_series(&self, id: i64) -> Result<Option<Series>> {
        let row: Option<SeriesRow> = sqlx::query_as(include_str!("../queries/get_series.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Series::try_from).transpose()
    }

    /// Persist a new series. Titles are unique per library, a duplicate is an
    /// [`ErrorKind::Conflict`].
    #[instrument(skip(self, series), fields(library_id = series.library_id, title = %series.title))]
    pub async fn create_series(&self, series: &NewSeries) -> Result<Series> {
        let result = sqlx::query_as::<_, SeriesRow>(include_str!("../queries/insert_series.sql"))
            .bind(series.library_id)
            .bind(&series.title)
            .bind(path_to_string(&series.root_path)?)
            .bind(metadata_to_json(series.metadata.as_ref())?)
            .bind(now())
            .fetch_one(&self.pool)
            .await;
        unique(result, || format!("series {:?}", series.title))?.try_into()
    }

    pub async fn list_series(&self, library_id: i64) -> Result<Vec<Series>> {
        let rows: Vec<SeriesRow> = sqlx::query_as(include_str!("../queries/list_series.sql"))
            .bind(library_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Series::try_from).collect()
    }

    /// Delete a series and (by cascade) its files.
    ///
    /// Returns `false` if there was no such series.
    #[instrument(skip(self))]
    pub async fn delete_series(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_series.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Set (or clear, with `None`) the path of a series' cover image.
    pub async fn update_series_cover(&self, id: i64, cover: Option<&Path>) -> Result<()> {
        let cover = cover.map(path_to_string).transpose()?.unwrap_or_default();
        let result = sqlx::query(include_str!("../queries/update_series_cover.sql"))
            .bind(cover)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::SeriesNotFound(id));
        }
        Ok(())
    }

    /// Replace (or clear, with `None`) the provider metadata of a series.
    pub async fn update_series_metadata(&self, id: i64, metadata: Option<&MangaMetadata>) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/update_series_metadata.sql"))
            .bind(metadata_to_json(metadata)?)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::SeriesNotFound(id));
        }
        Ok(())
    }

    /// Rename a series. The folder on disk is untouched, so the next scan of
    /// the library will see the old folder name as a new series unless the
    /// folder is renamed too.
    pub async fn update_series_title(&self, id: i64, title: impl AsRef<str>) -> Result<Series> {
        let title = title.as_ref();
        let result = sqlx::query_as::<_, SeriesRow>(include_str!("../queries/update_series_title.sql"))
            .bind(title)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match unique(result, || format!("series {title:?}"))? {
            Some(row) => row.try_into(),
            None => exn::bail!(ErrorKind::SeriesNotFound(id)),
        }
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// All files of a series in reading order (volume, chapter, name).
    pub async fn list_files(&self, series_id: i64) -> Result<Vec<File>> {
        let rows: Vec<FileRow> = sqlx::query_as(include_str!("../queries/list_files.sql"))
            .bind(series_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(File::try_from).collect()
    }

    pub async fn get_file(&self, id: i64) -> Result<Option<File>> {
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/get_file.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(File::try_from).transpose()
    }

    pub async fn count_files(&self, series_id: i64) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_files.sql"))
            .bind(series_id)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("file count"))
    }

    /// Reconcile the files of a series in a single transaction: delete the
    /// rows in `delete` and insert `create`.
    ///
    /// Either everything is applied or nothing is. Ids in `delete` that don't
    /// belong to `series_id` are ignored.
    #[instrument(skip(self, delete, create), fields(delete = delete.len(), create = create.len()))]
    pub async fn apply_file_changes(&self, series_id: i64, delete: &[i64], create: &[NewFile]) -> Result<FileChanges> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let mut changes = FileChanges::default();
        for id in delete {
            let result = sqlx::query(include_str!("../queries/delete_file.sql"))
                .bind(*id)
                .bind(series_id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            changes.deleted += result.rows_affected();
        }
        let discovered_at = now();
        for file in create {
            let result = sqlx::query_as::<_, FileRow>(include_str!("../queries/insert_file.sql"))
                .bind(series_id)
                .bind(path_to_string(&file.path)?)
                .bind(&file.file_name)
                .bind(file.file_format.to_string())
                .bind(i64::from(file.volume))
                .bind(f64::from(file.chapter))
                .bind(i64::from(file.total_pages))
                .bind(discovered_at)
                .fetch_one(&mut *tx)
                .await;
            let row = unique(result, || format!("file {}", file.path.display()))?;
            changes.created.push(File::try_from(row)?);
        }
        // Dropping the transaction on any error above rolls it back.
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(deleted = changes.deleted, created = changes.created.len(), "Applied file changes");
        Ok(changes)
    }

    /// Record the reader's position in a file.
    ///
    /// Pages past the end are rejected. Moving anywhere but the last page
    /// marks the file as unread again.
    pub async fn set_current_page(&self, file_id: i64, page: u32) -> Result<File> {
        let file = self.get_file(file_id).await?;
        let Some(file) = file else {
            exn::bail!(ErrorKind::FileNotFound(file_id));
        };
        if page > file.total_pages {
            exn::bail!(ErrorKind::PageOutOfRange {
                page,
                total_pages: file.total_pages,
            });
        }
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/set_current_page.sql"))
            .bind(i64::from(page))
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            Some(row) => row.try_into(),
            // Deleted by a scan in the meantime.
            None => exn::bail!(ErrorKind::FileNotFound(file_id)),
        }
    }

    /// Mark a file as read, which also moves it to its last page.
    pub async fn mark_read(&self, file_id: i64) -> Result<File> {
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/mark_read.sql"))
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match row {
            Some(row) => row.try_into(),
            None => exn::bail!(ErrorKind::FileNotFound(file_id)),
        }
    }

    /// Mark every file in a series as read. Returns how many files changed.
    pub async fn mark_series_read(&self, series_id: i64) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/mark_series_read.sql"))
            .bind(series_id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }
}
