//! Archive Reader
//!
//! One reader for every container we can page through. Zip-family archives
//! are read in place; RAR archives are unpacked into a scratch directory and
//! re-packed as a zip so everything downstream only ever deals with
//! [`ZipArchive`].

use crate::error::{ErrorKind, Result};
use crate::pages::{self, Page};
use exn::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Component, Path};
use tankobon_extract::models::FileFormat;
use tempfile::TempDir;
use tracing::instrument;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const NORMALIZED_NAME: &str = "normalized.zip";
const EXTRACTED_DIR: &str = "extracted";

pub struct ArchiveReader {
    zip: ZipArchive<BufReader<File>>,
    // Held for its Drop: removes the RAR scratch directory (and the zip we
    // are reading from) once the reader goes away.
    _scratch: Option<TempDir>,
}
impl ArchiveReader {
    /// Open an archive for reading.
    ///
    /// `scratch_root` is only touched for RAR archives; each call gets its own
    /// randomly named directory underneath it. 7z archives are recognized but
    /// not supported by the reader.
    #[instrument(skip_all, fields(path = %path.display(), format = %format))]
    pub fn open(path: &Path, format: FileFormat, scratch_root: &Path, buffer_size: usize) -> Result<Self> {
        if format.is_zip_family() {
            return Ok(Self {
                zip: open_zip(path, buffer_size)?,
                _scratch: None,
            });
        }
        if format.is_rar_family() {
            let scratch = tempfile::Builder::new()
                .prefix("rar-")
                .tempdir_in(scratch_root)
                .or_raise(|| ErrorKind::Io)?;
            let normalized = normalize_rar(path, scratch.path())?;
            return Ok(Self {
                zip: open_zip(&normalized, buffer_size)?,
                _scratch: Some(scratch),
            });
        }
        exn::bail!(ErrorKind::UnsupportedFormat(format.to_string()))
    }

    /// Image entries in reading order.
    pub fn pages(&mut self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        for index in 0..self.zip.len() {
            // Raw access reads the header only; nothing gets decompressed.
            let entry = self.zip.by_index_raw(index).or_raise(|| ErrorKind::InvalidArchive)?;
            if entry.is_dir() || !pages::is_image(entry.name()) {
                continue;
            }
            pages.push(Page {
                index,
                name: entry.name().to_string(),
            });
        }
        pages::sort(&mut pages);
        Ok(pages)
    }

    /// Decompress a single page into memory.
    pub fn read(&mut self, page: &Page) -> Result<Vec<u8>> {
        let mut entry = self.zip.by_index(page.index).or_raise(|| ErrorKind::InvalidArchive)?;
        let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
        entry.read_to_end(&mut bytes).or_raise(|| ErrorKind::InvalidArchive)?;
        Ok(bytes)
    }
}

fn open_zip(path: &Path, buffer_size: usize) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).or_raise(|| ErrorKind::Io)?;
    ZipArchive::new(BufReader::with_capacity(buffer_size, file)).or_raise(|| ErrorKind::InvalidArchive)
}

/// Unpack a RAR archive under `scratch` and re-pack its files into a zip next
/// to it. Returns the path of the new zip.
fn normalize_rar(path: &Path, scratch: &Path) -> Result<std::path::PathBuf> {
    let extracted = scratch.join(EXTRACTED_DIR);
    std::fs::create_dir_all(&extracted).or_raise(|| ErrorKind::Io)?;
    extract_rar(path, &extracted)?;

    let normalized = scratch.join(NORMALIZED_NAME);
    let file = File::create(&normalized).or_raise(|| ErrorKind::Io)?;
    let mut writer = ZipWriter::new(file);
    // Pages are already compressed images; deflating them again is a waste.
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for entry in WalkDir::new(&extracted).sort_by_file_name() {
        let entry = entry.or_raise(|| ErrorKind::Io)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(&extracted).or_raise(|| ErrorKind::Io)?;
        let name = zip_entry_name(relative).ok_or_raise(|| ErrorKind::InvalidArchive)?;
        writer.start_file(name, options).or_raise(|| ErrorKind::Io)?;
        let mut source = File::open(entry.path()).or_raise(|| ErrorKind::Io)?;
        io::copy(&mut source, &mut writer).or_raise(|| ErrorKind::Io)?;
    }
    writer.finish().or_raise(|| ErrorKind::Io)?;
    Ok(normalized)
}

fn extract_rar(path: &Path, destination: &Path) -> Result<()> {
    let mut archive = unrar::Archive::new(path)
        .open_for_processing()
        .or_raise(|| ErrorKind::InvalidArchive)?;
    while let Some(header) = archive.read_header().or_raise(|| ErrorKind::InvalidArchive)? {
        let entry = header.entry();
        let escapes = entry
            .filename
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        archive = if entry.is_file() && !escapes {
            header.extract_with_base(destination).or_raise(|| ErrorKind::InvalidArchive)?
        } else {
            if escapes {
                tracing::warn!(entry = %entry.filename.display(), "Skipping RAR entry outside of the archive root");
            }
            header.skip().or_raise(|| ErrorKind::InvalidArchive)?
        };
    }
    Ok(())
}

/// Zip entry names always use forward slashes, whatever the platform.
fn zip_entry_name(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
