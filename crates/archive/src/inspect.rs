use crate::error::{ErrorKind, Result};
use crate::reader::ArchiveReader;
use crate::thumbnail::Thumbnailer;
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use tankobon_extract::models::FileFormat;
use tracing::instrument;

/// Default size of the buffer archives are read through: 1 MiB.
pub const DEFAULT_READ_BUFFER_BYTES: usize = 1024 * 1024;

/// What an archive looks like from the outside.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Number of image entries (pages) in the archive.
    pub page_count: u32,
    /// Where the first-page preview was written, if one was.
    pub thumbnail: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Inspector {
    /// Parent directory for per-archive scratch space (RAR only).
    pub scratch_dir: PathBuf,
    pub read_buffer_bytes: usize,
    pub thumbnailer: Thumbnailer,
}
impl Default for Inspector {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            read_buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
            thumbnailer: Thumbnailer::default(),
        }
    }
}
impl Inspector {
    /// Count the pages in an archive and write a preview of the first one to
    /// `preview_path` (parent directories are created as needed).
    ///
    /// An archive with no images, or a 7z archive, yields zero pages and no
    /// preview without failing. This does blocking I/O and image decoding;
    /// async callers should run it on a blocking thread.
    #[instrument(skip(self), fields(page_count))]
    pub fn inspect(&self, archive_path: &Path, preview_path: &Path) -> Result<Inspection> {
        let format = FileFormat::from_path(archive_path).ok_or_raise(|| {
            let extension = archive_path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
            ErrorKind::UnsupportedFormat(extension)
        })?;
        if format.is_7z_family() {
            tracing::debug!("7z archives are not inspected");
            return Ok(Inspection::default());
        }

        let mut reader = ArchiveReader::open(archive_path, format, &self.scratch_dir, self.read_buffer_bytes)?;
        let pages = reader.pages()?;
        let Some(first) = pages.first() else {
            tracing::debug!("Archive contains no images");
            return Ok(Inspection::default());
        };
        let page_count = u32::try_from(pages.len()).or_raise(|| ErrorKind::InvalidArchive)?;
        tracing::Span::current().record("page_count", page_count);

        let bytes = reader.read(first)?;
        let jpeg = self.thumbnailer.thumbnail(&bytes)?;
        if let Some(parent) = preview_path.parent() {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        std::fs::write(preview_path, jpeg).or_raise(|| ErrorKind::Io)?;
        tracing::debug!(first_page = %first.name, "Preview written");

        Ok(Inspection {
            page_count,
            thumbnail: Some(preview_path.to_path_buf()),
        })
    }
}
