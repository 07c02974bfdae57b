use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use rstest::rstest;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tankobon_archive::error::ErrorKind;
use tankobon_archive::{ArchiveReader, Inspection, Inspector};
use tankobon_extract::models::FileFormat;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let image = ImageBuffer::from_pixel(width, height, Rgb([shade, shade, shade]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut writer = ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
    }
    writer.finish().unwrap();
}

struct Fixture {
    dir: TempDir,
}
impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
    fn inspector(&self) -> Inspector {
        Inspector {
            scratch_dir: self.dir.path().to_path_buf(),
            ..Inspector::default()
        }
    }
}

#[test]
fn test_first_page_becomes_preview() {
    let fixture = Fixture::new();
    let archive = fixture.path("Series v01.cbz");
    // Distinct sizes so we can tell which page the preview came from.
    write_zip(&archive, &[("p10.jpg", png(40, 10, 10)), ("p2.jpg", png(30, 10, 20)), ("p1.jpg", png(20, 10, 30))]);
    let preview = fixture.path("previews/Series v01.cbz.jpg");

    let inspection = fixture.inspector().inspect(&archive, &preview).unwrap();

    assert_eq!(
        inspection,
        Inspection {
            page_count: 3,
            thumbnail: Some(preview.clone()),
        }
    );
    let written = image::open(&preview).unwrap();
    assert_eq!((written.width(), written.height()), (20, 10));
}

#[test]
fn test_non_images_and_directories_are_not_pages() {
    let fixture = Fixture::new();
    let archive = fixture.path("book.zip");
    write_zip(&archive, &[
        ("chapter 1/", Vec::new()),
        ("chapter 1/001.PNG", png(8, 8, 0)),
        ("chapter 1/002.png", png(8, 8, 0)),
        ("ComicInfo.xml", b"<ComicInfo/>".to_vec()),
        ("Thumbs.db", vec![0; 16]),
    ]);

    let inspection = fixture.inspector().inspect(&archive, &fixture.path("preview.jpg")).unwrap();
    assert_eq!(inspection.page_count, 2);
    assert!(inspection.thumbnail.is_some());
}

#[test]
fn test_archive_without_images() {
    let fixture = Fixture::new();
    let archive = fixture.path("notes.cbz");
    write_zip(&archive, &[("readme.txt", b"nothing to see here".to_vec())]);
    let preview = fixture.path("preview.jpg");

    let inspection = fixture.inspector().inspect(&archive, &preview).unwrap();

    assert_eq!(inspection, Inspection::default());
    assert!(!preview.exists());
}

#[rstest]
#[case("book.7z")]
#[case("book.CB7")]
fn test_seven_zip_is_cataloged_without_pages(#[case] name: &str) {
    let fixture = Fixture::new();
    let archive = fixture.path(name);
    std::fs::write(&archive, b"7z\xBC\xAF\x27\x1C").unwrap();

    let inspection = fixture.inspector().inspect(&archive, &fixture.path("preview.jpg")).unwrap();
    assert_eq!(inspection, Inspection::default());
}

#[test]
fn test_undecodable_first_page_is_an_error() {
    let fixture = Fixture::new();
    let archive = fixture.path("broken.cbz");
    write_zip(&archive, &[("001.jpg", b"not really a jpeg".to_vec()), ("002.jpg", png(8, 8, 0))]);

    let err = fixture.inspector().inspect(&archive, &fixture.path("preview.jpg")).unwrap_err();
    assert!(matches!(*err, ErrorKind::Decode(_)));
}

#[test]
fn test_avif_first_page_cannot_be_previewed() {
    let fixture = Fixture::new();
    let archive = fixture.path("modern.cbz");
    let mut avif = b"\0\0\0\x1cftypavif\0\0\0\0avifmif1miaf".to_vec();
    avif.extend_from_slice(&[0; 64]);
    write_zip(&archive, &[("001.avif", avif), ("002.png", png(8, 8, 0))]);
    let preview = fixture.path("preview.jpg");

    let err = fixture.inspector().inspect(&archive, &preview).unwrap_err();
    assert!(matches!(*err, ErrorKind::Decode(_)));
    assert!(!preview.exists());
}

#[test]
fn test_unknown_extension_is_rejected() {
    let fixture = Fixture::new();
    let archive = fixture.path("book.pdf");
    std::fs::write(&archive, b"%PDF-1.7").unwrap();

    let err = fixture.inspector().inspect(&archive, &fixture.path("preview.jpg")).unwrap_err();
    assert_eq!(*err, ErrorKind::UnsupportedFormat("pdf".to_string()));
}

#[test]
fn test_reader_lists_pages_in_reading_order() {
    let fixture = Fixture::new();
    let archive = fixture.path("book.cbz");
    write_zip(&archive, &[("B.jpg", png(2, 2, 0)), ("a.jpg", png(2, 2, 0)), ("A.jpg", png(2, 2, 0))]);

    let mut reader = ArchiveReader::open(&archive, FileFormat::Cbz, fixture.dir.path(), 4096).unwrap();
    let names: Vec<_> = reader.pages().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["A.jpg", "a.jpg", "B.jpg"]);
}
