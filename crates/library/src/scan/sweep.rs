use super::Scanner;
use super::error::{ErrorKind, Result};
use tankobon_catalog::Library;
use tankobon_storage::{LocalBackend, layout};
use tracing::instrument;

impl Scanner {
    /// Delete every series of the library whose folder no longer exists,
    /// along with its files and generated artifacts.
    #[instrument(skip_all)]
    pub(super) async fn sweep(&self, backend: &LocalBackend, library: &Library) -> Result<usize> {
        let mut removed = 0;
        for series in self.repo.list_series(library.id).await.map_err(ErrorKind::catalog)? {
            match tokio::fs::try_exists(&series.root_path).await {
                Ok(true) => continue,
                Ok(false) => {},
                Err(err) => {
                    // Can't tell, so leave it be.
                    tracing::warn!(series = %series.title, error = %err, "Could not check series folder");
                    continue;
                },
            }
            tracing::info!(series = %series.title, series_id = series.id, "Series folder is gone, removing");
            if let Err(err) = self.repo.delete_series(series.id).await {
                tracing::warn!(series = %series.title, error = %*err, "Could not remove series");
                continue;
            }
            if let Err(err) = backend.remove_dir_all(layout::series_dir(series.id)).await {
                tracing::warn!(series_id = series.id, error = %*err, "Could not remove series artifacts");
            }
            removed += 1;
        }
        Ok(removed)
    }
}
