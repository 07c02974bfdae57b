use super::Scanner;
use super::error::{ErrorKind, Result};
use std::path::PathBuf;
use tankobon_catalog::{Library, NewSeries, Series};
use tankobon_extract::models::MangaMetadata;
use tankobon_metadata::Selector;
use tankobon_storage::{LocalBackend, layout};
use tracing::instrument;

impl Scanner {
    /// Make sure the series exists in the catalog, then bring its files up
    /// to date.
    #[instrument(skip_all, fields(series = %name))]
    pub(super) async fn reconcile_series(&self, backend: &LocalBackend, library: &Library, name: &str) -> Result<()> {
        let existing = self.repo.find_series(library.id, name).await.map_err(ErrorKind::catalog)?;
        let series = match existing {
            Some(series) => series,
            None => self.create_series(backend, library, name).await?,
        };
        self.reconcile_files(backend, library.id, &series, name).await
    }

    async fn create_series(&self, backend: &LocalBackend, library: &Library, name: &str) -> Result<Series> {
        let metadata = match self.metadata.resolve(Selector::Title, name).await {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(provider = self.metadata.name(), error = %*err, "Metadata lookup failed");
                None
            },
        };
        let series = self
            .repo
            .create_series(&NewSeries {
                library_id: library.id,
                title: name.to_string(),
                root_path: library.root_path.join(name),
                metadata: metadata.clone(),
            })
            .await
            .map_err(ErrorKind::catalog)?;
        tracing::info!(series_id = series.id, with_metadata = metadata.is_some(), "Created series");
        backend.create_dir_all(layout::previews_dir(series.id)).await.map_err(ErrorKind::storage)?;

        let Some(metadata) = metadata else {
            return Ok(series);
        };
        if let Some(url) = &metadata.cover_image {
            match self.store_cover(backend, series.id, url).await {
                Ok(cover) => {
                    self.repo.update_series_cover(series.id, Some(&cover)).await.map_err(ErrorKind::catalog)?;
                },
                Err(err) => tracing::warn!(url = %url, error = %*err, "Could not store cover"),
            }
        }
        self.cool_down(&metadata).await;
        // Re-read so the cover is on the returned row.
        let series = self.repo.get_series(series.id).await.map_err(ErrorKind::catalog)?.unwrap_or(series);
        Ok(series)
    }

    /// Download the cover art, re-encode it as JPEG and write it next to the
    /// previews. Returns where it went.
    async fn store_cover(&self, backend: &LocalBackend, series_id: i64, url: &str) -> Result<PathBuf> {
        let bytes = self.metadata.download(url).await.map_err(ErrorKind::cover)?;
        let thumbnailer = self.inspector.thumbnailer;
        let jpeg = tokio::task::spawn_blocking(move || thumbnailer.reencode(&bytes))
            .await
            .map_err(|err| exn::Exn::from(ErrorKind::Cover(err.to_string())))?
            .map_err(|err| {
                let message = (*err).to_string();
                err.raise(ErrorKind::Cover(message))
            })?;
        let relative = layout::cover_path(series_id);
        backend.write(&relative, &jpeg).await.map_err(ErrorKind::storage)?;
        backend.absolute_path(&relative).map_err(ErrorKind::storage)
    }

    /// Lookups already queue behind the rate limiter; this spaces out the
    /// cover downloads that follow them too.
    async fn cool_down(&self, metadata: &MangaMetadata) {
        if self.cooldown.is_zero() {
            return;
        }
        tracing::debug!(provider = %metadata.provider, cooldown = ?self.cooldown, "Cooling down");
        tokio::time::sleep(self.cooldown).await;
    }
}
