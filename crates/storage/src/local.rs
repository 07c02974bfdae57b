//! Local filesystem access for one library.
//!
//! Every path going in or coming out is relative to the library root, and is
//! validated on the way in.

use crate::error::{ErrorKind, Result};
use crate::layout::ARTIFACTS_DIR;
use crate::path::validate as validate_path;
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{self, DirEntry};
use tracing::instrument;

/// Relative paths of every regular file below a directory.
pub type FileStream<'a> = Pin<Box<dyn Stream<Item = Result<PathBuf>> + Send + 'a>>;

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// A library root on the local filesystem.
///
/// ```no_run
/// use tankobon_storage::LocalBackend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("/srv/manga")?;
/// for series in backend.list_dirs().await? {
///     println!("{series}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}
impl LocalBackend {
    /// The root must be absolute. It doesn't have to exist yet; listing a
    /// missing root is an error, writing into one creates it.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate a relative path and anchor it at the root.
    pub fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }

    fn relative_path(&self, absolute: &Path) -> Result<PathBuf> {
        let relative = absolute
            .strip_prefix(&self.root)
            .or_raise(|| ErrorKind::InvalidPath(absolute.to_path_buf()))?;
        validate_path(relative)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotADirectory => ErrorKind::NotADirectory(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Names of the immediate subdirectories of the root, sorted, without the
    /// artifacts folder. Symlinked directories count.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn list_dirs(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| Self::map_io_error(e, &self.root))?;
        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, &self.root))? {
            let path = entry.path();
            let is_dir = match fs::metadata(&path).await {
                Ok(metadata) => metadata.is_dir(),
                // Dangling symlink.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(Self::map_io_error(e, &path).into()),
            };
            if !is_dir {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if name == ARTIFACTS_DIR => {},
                Ok(name) => dirs.push(name),
                Err(name) => tracing::warn!(name = ?name, "Skipping folder with a non UTF-8 name"),
            }
        }
        dirs.sort();
        tracing::debug!(count = dirs.len(), "Listed library folders");
        Ok(dirs)
    }

    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Self::map_io_error(e, &path))?;
        if file_type.is_dir() {
            if path.parent() == Some(self.root.as_path()) && entry.file_name() == ARTIFACTS_DIR {
                return Ok(WalkEntry::Skip);
            }
            return Ok(WalkEntry::Descend(path));
        }
        if file_type.is_file() {
            return Ok(WalkEntry::File(self.relative_path(&path)?));
        }
        // Symlinks below the top level aren't followed; cycles aren't worth it.
        Ok(WalkEntry::Skip)
    }

    /// Recursively list regular files below `prefix` (the whole library when
    /// `None`). A prefix that doesn't exist yields nothing. Errors on
    /// individual entries are yielded and the walk carries on.
    pub fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileStream<'a> {
        let start = match prefix.map(|p| self.absolute_path(p)).transpose() {
            Ok(start) => start.unwrap_or_else(|| self.root.clone()),
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        let mut stack = vec![start];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    pub async fn exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        let absolute = self.absolute_path(path)?;
        Ok(fs::try_exists(&absolute).await.map_err(ErrorKind::Io)?)
    }

    /// Write a file, creating parent directories as needed.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let absolute = self.absolute_path(path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&absolute, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    pub async fn create_dir_all(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let absolute = self.absolute_path(path)?;
        Ok(fs::create_dir_all(&absolute).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    /// Delete a single file. Returns `false` if it was already gone.
    pub async fn remove_file(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let absolute = self.absolute_path(path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(e, path).into()),
        }
    }

    /// Delete a directory tree. Returns `false` if it was already gone.
    pub async fn remove_dir_all(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let absolute = self.absolute_path(path)?;
        match fs::remove_dir_all(&absolute).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(e, path).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();
        (dir, backend)
    }

    async fn listed(backend: &LocalBackend, prefix: Option<&Path>) -> Vec<PathBuf> {
        let mut files: Vec<_> = backend.list_stream(prefix).try_collect().await.unwrap();
        files.sort();
        files
    }

    #[test]
    fn test_new_requires_absolute_path() {
        assert!(LocalBackend::new("relative/manga").is_err());
        assert!(LocalBackend::new("./manga").is_err());
        assert!(LocalBackend::new("/srv/does/not/exist/yet").is_ok());
    }

    #[test]
    fn test_absolute_path() {
        let backend = LocalBackend::new("/srv/manga").unwrap();
        assert_eq!(backend.absolute_path("Berserk/v01.cbz").unwrap(), Path::new("/srv/manga/Berserk/v01.cbz"));
        assert!(backend.absolute_path("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_list_dirs_skips_artifacts_and_files() {
        let (_dir, backend) = backend();
        for name in ["Vagabond", "Berserk", ".tankobon/series/1", "Akira"] {
            backend.create_dir_all(name).await.unwrap();
        }
        backend.write("loose.cbz", b"zip").await.unwrap();
        assert_eq!(backend.list_dirs().await.unwrap(), ["Akira", "Berserk", "Vagabond"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_dirs_follows_symlinks() {
        let (dir, backend) = backend();
        let elsewhere = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), dir.path().join("Linked")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("Dangling")).unwrap();
        assert_eq!(backend.list_dirs().await.unwrap(), ["Linked"]);
    }

    #[tokio::test]
    async fn test_list_dirs_missing_root() {
        let backend = LocalBackend::new("/definitely/not/a/library").unwrap();
        let err = backend.list_dirs().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_stream_recurses() {
        let (_dir, backend) = backend();
        backend.write("Berserk/v01.cbz", b"a").await.unwrap();
        backend.write("Berserk/Extras/art.cbz", b"b").await.unwrap();
        backend.write("Vagabond/v01.cbr", b"c").await.unwrap();
        backend.write(".tankobon/series/1/cover.jpg", b"d").await.unwrap();

        assert_eq!(listed(&backend, Some(Path::new("Berserk"))).await, [
            PathBuf::from("Berserk/Extras/art.cbz"),
            PathBuf::from("Berserk/v01.cbz"),
        ]);
        // The whole library, minus artifacts.
        assert_eq!(listed(&backend, None).await.len(), 3);
    }

    #[tokio::test]
    async fn test_list_stream_missing_prefix_is_empty() {
        let (_dir, backend) = backend();
        assert!(listed(&backend, Some(Path::new("Nothing"))).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_stream_rejects_escaping_prefix() {
        let (_dir, backend) = backend();
        let result: Result<Vec<_>> = backend.list_stream(Some(Path::new("../.."))).try_collect().await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_write_exists_and_remove() {
        let (dir, backend) = backend();
        backend.write(".tankobon/series/3/previews/v01.cbz.jpg", b"jpeg").await.unwrap();
        assert!(backend.exists(".tankobon/series/3/previews/v01.cbz.jpg").await.unwrap());
        assert_eq!(
            std::fs::read(dir.path().join(".tankobon/series/3/previews/v01.cbz.jpg")).unwrap(),
            b"jpeg"
        );

        assert!(backend.remove_file(".tankobon/series/3/previews/v01.cbz.jpg").await.unwrap());
        assert!(!backend.remove_file(".tankobon/series/3/previews/v01.cbz.jpg").await.unwrap());

        assert!(backend.remove_dir_all(".tankobon/series/3").await.unwrap());
        assert!(!backend.exists(".tankobon/series/3").await.unwrap());
        assert!(!backend.remove_dir_all(".tankobon/series/3").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_dir, backend) = backend();
        assert!(backend.write("../escape.txt", b"nope").await.is_err());
        assert!(backend.create_dir_all("a/../../b").await.is_err());
        assert!(backend.remove_dir_all("..").await.is_err());
        assert!(backend.exists("../../etc/passwd").await.is_err());
    }
}
