//! Adding and removing libraries.

use crate::error::{ErrorKind, Result};
use crate::tracker::ScanTracker;
use exn::ResultExt;
use std::path::Path;
use tankobon_catalog::error::ErrorKind as CatalogErrorKind;
use tankobon_catalog::{Library, Repository};
use tankobon_storage::LocalBackend;
use tankobon_storage::layout::ARTIFACTS_DIR;
use tracing::instrument;

/// Register a folder as a library. The folder must exist; it's stored in
/// canonical form so the same folder can't be added twice under different
/// spellings.
#[instrument(skip(repo, root_path), fields(root_path = %root_path.as_ref().display()))]
pub async fn add_library(repo: &Repository, name: &str, root_path: impl AsRef<Path>) -> Result<Library> {
    let name = name.trim();
    if name.is_empty() {
        exn::bail!(ErrorKind::InvalidArgument("library name cannot be empty".to_string()));
    }
    let root_path = root_path.as_ref();
    let canonical = match tokio::fs::canonicalize(root_path).await {
        Ok(path) => path,
        Err(err) => exn::bail!(ErrorKind::InvalidArgument(format!("{}: {err}", root_path.display()))),
    };
    if !canonical.is_dir() {
        exn::bail!(ErrorKind::InvalidArgument(format!("{} is not a directory", canonical.display())));
    }
    match repo.create_library(name, &canonical).await {
        Ok(library) => Ok(library),
        Err(err) if matches!(*err, CatalogErrorKind::Conflict(_)) => {
            let message = format!("{} is already a library", canonical.display());
            Err(err.raise(ErrorKind::InvalidArgument(message)))
        },
        Err(err) => Err(err.raise(ErrorKind::Catalog)),
    }
}

/// Forget a library: its series and files go from the catalog and its
/// artifacts folder goes from disk. The archives themselves are never
/// touched. Refuses while the library is being scanned.
#[instrument(skip(repo, tracker))]
pub async fn remove_library(repo: &Repository, tracker: &ScanTracker, library_id: i64) -> Result<Library> {
    let library = repo
        .get_library(library_id)
        .await
        .or_raise(|| ErrorKind::Catalog)?
        .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(library_id)))?;
    if tracker.is_scanning(library_id).await {
        exn::bail!(ErrorKind::AlreadyInProgress(library_id));
    }
    if !repo.delete_library(library_id).await.or_raise(|| ErrorKind::Catalog)? {
        exn::bail!(ErrorKind::NotFound(library_id));
    }
    let backend = LocalBackend::new(&library.root_path).or_raise(|| ErrorKind::Storage)?;
    match backend.remove_dir_all(ARTIFACTS_DIR).await {
        Ok(removed) => tracing::info!(library = %library.name, artifacts_removed = removed, "Removed library"),
        Err(err) => tracing::warn!(library = %library.name, error = %*err, "Removed library, but not its artifacts"),
    }
    Ok(library)
}
