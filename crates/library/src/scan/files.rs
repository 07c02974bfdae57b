use super::Scanner;
use super::error::{ErrorKind, Result};
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tankobon_catalog::{NewFile, Series};
use tankobon_extract::models::FileFormat;
use tankobon_extract::parse_filename;
use tankobon_storage::{LocalBackend, layout};
use tracing::instrument;

impl Scanner {
    /// Diff the archives in a series folder against the catalog, inspect the
    /// new ones, and commit every deletion and creation together.
    #[instrument(skip_all, fields(series_id = series.id))]
    pub(super) async fn reconcile_files(
        &self,
        backend: &LocalBackend,
        library_id: i64,
        series: &Series,
        name: &str,
    ) -> Result<()> {
        let on_disk = list_archives(backend, name).await?;
        let stored = self.repo.list_files(series.id).await.map_err(ErrorKind::catalog)?;

        let disk_paths: HashSet<&Path> = on_disk.iter().map(PathBuf::as_path).collect();
        let stored_paths: HashSet<&Path> = stored.iter().map(|f| f.path.as_path()).collect();
        let gone: Vec<_> = stored.iter().filter(|f| !disk_paths.contains(f.path.as_path())).collect();
        let delete: Vec<i64> = gone.iter().map(|f| f.id).collect();

        if on_disk.is_empty() && delete.is_empty() {
            tracing::debug!("No archives");
            return Ok(());
        }

        let total = on_disk.len();
        self.tracker.set_progress(library_id, name, 0, total).await;
        let mut create = Vec::new();
        for (index, path) in on_disk.iter().enumerate() {
            if !stored_paths.contains(path.as_path()) {
                create.push(self.catalog_file(backend, series.id, path).await?);
            }
            self.tracker.set_progress(library_id, name, index + 1, total).await;
        }

        if create.is_empty() && delete.is_empty() {
            return Ok(());
        }
        let changes =
            self.repo.apply_file_changes(series.id, &delete, &create).await.map_err(ErrorKind::catalog)?;
        tracing::info!(created = changes.created.len(), deleted = changes.deleted, "Files reconciled");

        // A moved file keeps its name, and so its freshly written preview.
        let created_names: HashSet<&str> = create.iter().map(|f| f.file_name.as_str()).collect();
        for file in gone.iter().filter(|f| !created_names.contains(f.file_name.as_str())) {
            if let Err(err) = backend.remove_file(layout::preview_path(series.id, &file.file_name)).await {
                tracing::warn!(file = %file.file_name, error = %*err, "Could not remove stale preview");
            }
        }
        Ok(())
    }

    /// Everything needed to catalog one archive. Inspection failures are not
    /// errors here; the file is cataloged with zero pages.
    async fn catalog_file(&self, backend: &LocalBackend, series_id: i64, path: &Path) -> Result<NewFile> {
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let file_format = FileFormat::from_path(path)
            .ok_or_else(|| exn::Exn::from(ErrorKind::Storage(format!("not an archive: {}", path.display()))))?;
        let numbering = parse_filename(&file_name);
        let preview = backend.absolute_path(layout::preview_path(series_id, &file_name)).map_err(ErrorKind::storage)?;

        let inspector = self.inspector.clone();
        let archive = path.to_path_buf();
        let started = std::time::Instant::now();
        let total_pages = match tokio::task::spawn_blocking(move || inspector.inspect(&archive, &preview)).await {
            Ok(Ok(inspection)) => inspection.page_count,
            Ok(Err(err)) => {
                tracing::warn!(file = %file_name, error = %*err, "Could not inspect archive");
                0
            },
            Err(err) => {
                tracing::error!(file = %file_name, error = %err, "Archive inspection panicked");
                0
            },
        };
        tracing::debug!(file = %file_name, total_pages, elapsed = ?started.elapsed(), "Processed file");

        Ok(NewFile {
            path: path.to_path_buf(),
            file_name,
            file_format,
            volume: numbering.volume_or_default(),
            chapter: numbering.chapter_or_default(),
            total_pages,
        })
    }
}

/// Absolute paths of the archives below a series folder, in walk order.
async fn list_archives(backend: &LocalBackend, name: &str) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    let mut files = backend.list_stream(Some(Path::new(name)));
    while let Some(file) = files.next().await {
        let relative = file.map_err(ErrorKind::storage)?;
        if FileFormat::from_path(&relative).is_some() {
            archives.push(backend.root().join(relative));
        }
    }
    Ok(archives)
}
