use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tankobon_archive::Inspector;
use tankobon_catalog::{Database, Library, Repository};
use tankobon_extract::models::{FileFormat, MangaMetadata};
use tankobon_library::error::ErrorKind;
use tankobon_library::{ScanSnapshot, ScanTracker, Scanner, SeriesState, add_library, remove_library};
use tankobon_metadata::error::{ErrorKind as MetadataErrorKind, Result as MetadataResult};
use tankobon_metadata::{MetadataSource, Selector};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = ImageBuffer::from_pixel(width, height, Rgb([200u8, 100, 50]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn write_archive(path: &Path, pages: usize) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut writer = ZipWriter::new(std::fs::File::create(path).unwrap());
    for page in 1..=pages {
        writer.start_file(format!("{page:03}.png"), SimpleFileOptions::default()).unwrap();
        writer.write_all(&png(16, 24)).unwrap();
    }
    writer.finish().unwrap();
}

/// Answers lookups from a fixed table and counts them.
#[derive(Default)]
struct StubSource {
    known: Mutex<Vec<MangaMetadata>>,
    cover: Option<Vec<u8>>,
    fail_lookups: bool,
    lookups: AtomicUsize,
}

#[async_trait]
impl MetadataSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn resolve(&self, _selector: Selector, query: &str) -> MetadataResult<Option<MangaMetadata>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            exn::bail!(MetadataErrorKind::Request("connection refused".to_string()));
        }
        Ok(self.known.lock().unwrap().iter().find(|m| m.has_title(query)).cloned())
    }

    async fn download(&self, _url: &str) -> MetadataResult<Vec<u8>> {
        match &self.cover {
            Some(bytes) => Ok(bytes.clone()),
            None => exn::bail!(MetadataErrorKind::Status(404)),
        }
    }
}

struct Fixture {
    root: TempDir,
    scratch: TempDir,
    db: Database,
    repo: Repository,
    library: Library,
}
impl Fixture {
    async fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let library = repo.create_library("Manga", root.path()).await.unwrap();
        Self {
            root,
            scratch,
            db,
            repo,
            library,
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn scanner(&self, source: Arc<dyn MetadataSource>) -> Scanner {
        let inspector = Inspector {
            scratch_dir: self.scratch.path().to_path_buf(),
            ..Inspector::default()
        };
        Scanner::new(self.repo.clone(), Arc::new(ScanTracker::new()), source, inspector).with_cooldown(Duration::ZERO)
    }

    async fn scan(&self, scanner: &Scanner) -> ScanSnapshot {
        let started = scanner.start_scan(self.library.id).await.unwrap();
        started.handle.await.unwrap();
        scanner.status(self.library.id).await.unwrap()
    }

    async fn file_names(&self, title: &str) -> Vec<String> {
        let series = self.repo.find_series(self.library.id, title).await.unwrap().unwrap();
        self.repo.list_files(series.id).await.unwrap().into_iter().map(|f| f.file_name).collect()
    }
}

#[tokio::test]
async fn test_unknown_library() {
    let fixture = Fixture::new().await;
    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    let err = scanner.start_scan(999).await.unwrap_err();
    assert_eq!(*err, ErrorKind::NotFound(999));
    assert_eq!(err.http_status(), 404);
    assert_eq!(scanner.status(999).await, None);
}

#[tokio::test]
async fn test_second_scan_is_refused_while_the_first_runs() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Berserk/Berserk v01.cbz"), 3);
    let scanner = fixture.scanner(Arc::new(StubSource::default()));

    let first = scanner.start_scan(fixture.library.id).await.unwrap();
    assert_eq!(first.remaining, ["Berserk"]);
    let err = scanner.start_scan(fixture.library.id).await.unwrap_err();
    assert_eq!(*err, ErrorKind::AlreadyInProgress(fixture.library.id));
    assert_eq!(err.http_status(), 409);

    first.handle.await.unwrap();
    let status = scanner.status(fixture.library.id).await.unwrap();
    assert!(!status.in_progress);
    assert_eq!(status.completed_series, 1);
    assert!(status.remaining.is_empty());

    // Done, so the next one goes ahead.
    scanner.start_scan(fixture.library.id).await.unwrap().handle.await.unwrap();
}

#[tokio::test]
async fn test_full_scan() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Berserk/Berserk Vol. 2.cbz"), 2);
    write_archive(&fixture.path("Berserk/Berserk Vol. 1.cbz"), 5);
    write_archive(&fixture.path("Berserk/Extras/Berserk c100.5.zip"), 1);
    std::fs::write(fixture.path("Berserk/notes.txt"), "not an archive").unwrap();
    std::fs::create_dir_all(fixture.path("Akira")).unwrap();
    std::fs::write(fixture.path("stray.cbz"), "top-level files are not series").unwrap();
    let scanner = fixture.scanner(Arc::new(StubSource::default()));

    let status = fixture.scan(&scanner).await;
    assert_eq!(status.total_series, 2);
    assert_eq!(status.completed_series, 2);
    assert_eq!(status.series.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["Akira", "Berserk"]);
    assert!(status.series.iter().all(|s| s.state == SeriesState::Complete));
    let berserk_progress = status.series[1].progress.unwrap();
    assert_eq!((berserk_progress.current, berserk_progress.total), (3, 3));

    // A folder without archives is still a series, just an empty one.
    let akira = fixture.repo.find_series(fixture.library.id, "Akira").await.unwrap().unwrap();
    assert_eq!(fixture.repo.count_files(akira.id).await.unwrap(), 0);
    assert!(fixture.path(&format!(".tankobon/series/{}/previews", akira.id)).is_dir());

    let berserk = fixture.repo.find_series(fixture.library.id, "Berserk").await.unwrap().unwrap();
    assert_eq!(berserk.root_path, fixture.path("Berserk"));
    let files = fixture.repo.list_files(berserk.id).await.unwrap();
    let summary: Vec<_> = files.iter().map(|f| (f.file_name.as_str(), f.volume, f.chapter, f.total_pages)).collect();
    assert_eq!(summary, [
        ("Berserk c100.5.zip", 0, 100.5, 1),
        ("Berserk Vol. 1.cbz", 1, 0.0, 5),
        ("Berserk Vol. 2.cbz", 2, 0.0, 2),
    ]);
    assert_eq!(files[1].file_format, FileFormat::Cbz);
    assert_eq!(files[1].path, fixture.path("Berserk/Berserk Vol. 1.cbz"));
    for file in &files {
        let preview = fixture.path(&format!(".tankobon/series/{}/previews/{}.jpg", berserk.id, file.file_name));
        assert!(preview.is_file(), "missing preview for {}", file.file_name);
    }
}

#[tokio::test]
async fn test_rescan_reconciles_added_and_deleted_files() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Berserk/v01.cbz"), 2);
    write_archive(&fixture.path("Berserk/v02.cbz"), 2);
    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    fixture.scan(&scanner).await;

    let berserk = fixture.repo.find_series(fixture.library.id, "Berserk").await.unwrap().unwrap();
    let before = fixture.repo.list_files(berserk.id).await.unwrap();
    let kept = before.iter().find(|f| f.file_name == "v02.cbz").unwrap().clone();
    fixture.repo.set_current_page(kept.id, 1).await.unwrap();

    std::fs::remove_file(fixture.path("Berserk/v01.cbz")).unwrap();
    write_archive(&fixture.path("Berserk/v03.cbz"), 4);
    let status = fixture.scan(&scanner).await;
    assert_eq!(status.series[0].state, SeriesState::Complete);

    let after = fixture.repo.list_files(berserk.id).await.unwrap();
    assert_eq!(after.iter().map(|f| f.file_name.as_str()).collect::<Vec<_>>(), ["v02.cbz", "v03.cbz"]);
    // Untouched rows keep their identity and reading progress.
    let still_there = after.iter().find(|f| f.file_name == "v02.cbz").unwrap();
    assert_eq!((still_there.id, still_there.current_page), (kept.id, 1));

    let previews = fixture.path(&format!(".tankobon/series/{}/previews", berserk.id));
    assert!(!previews.join("v01.cbz.jpg").exists());
    assert!(previews.join("v03.cbz.jpg").exists());
}

#[tokio::test]
async fn test_emptied_folder_drops_its_files() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Berserk/v01.cbz"), 2);
    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    fixture.scan(&scanner).await;
    assert_eq!(fixture.file_names("Berserk").await, ["v01.cbz"]);

    std::fs::remove_file(fixture.path("Berserk/v01.cbz")).unwrap();
    let status = fixture.scan(&scanner).await;
    assert_eq!(status.series[0].state, SeriesState::Complete);
    assert!(fixture.file_names("Berserk").await.is_empty());
}

#[tokio::test]
async fn test_broken_archives_are_cataloged_without_pages() {
    let fixture = Fixture::new().await;
    std::fs::create_dir_all(fixture.path("Berserk")).unwrap();
    std::fs::write(fixture.path("Berserk/broken.cbz"), "definitely not a zip").unwrap();
    std::fs::write(fixture.path("Berserk/packed.cb7"), "7z is never opened").unwrap();
    write_archive(&fixture.path("Berserk/textless.cbz"), 0);
    let scanner = fixture.scanner(Arc::new(StubSource::default()));

    let status = fixture.scan(&scanner).await;
    assert_eq!(status.series[0].state, SeriesState::Complete);
    let berserk = fixture.repo.find_series(fixture.library.id, "Berserk").await.unwrap().unwrap();
    let files = fixture.repo.list_files(berserk.id).await.unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| f.total_pages == 0));
    let previews = fixture.path(&format!(".tankobon/series/{}/previews", berserk.id));
    assert_eq!(std::fs::read_dir(previews).unwrap().count(), 0);
}

#[tokio::test]
async fn test_new_series_get_metadata_and_cover() {
    let fixture = Fixture::new().await;
    std::fs::create_dir_all(fixture.path("Berserk")).unwrap();
    std::fs::create_dir_all(fixture.path("Unknown Doujin")).unwrap();
    let berserk_metadata = MangaMetadata {
        provider: "stub".to_string(),
        provider_id: 2,
        title: "Berserk".to_string(),
        cover_image: Some("https://cdn.example.com/2.webp".to_string()),
        ..Default::default()
    };
    let source = Arc::new(StubSource {
        known: Mutex::new(vec![berserk_metadata.clone()]),
        cover: Some(png(600, 900)),
        ..Default::default()
    });
    let scanner = fixture.scanner(source.clone());
    fixture.scan(&scanner).await;

    let berserk = fixture.repo.find_series(fixture.library.id, "Berserk").await.unwrap().unwrap();
    assert_eq!(berserk.metadata, Some(berserk_metadata));
    let cover = fixture.path(&format!(".tankobon/series/{}/cover.jpg", berserk.id));
    assert_eq!(berserk.cover.as_deref(), Some(cover.as_path()));
    let jpeg = image::open(&cover).unwrap();
    // Covers keep their size, only the encoding changes.
    assert_eq!((jpeg.width(), jpeg.height()), (600, 900));

    let unknown = fixture.repo.find_series(fixture.library.id, "Unknown Doujin").await.unwrap().unwrap();
    assert_eq!(unknown.metadata, None);
    assert_eq!(unknown.cover, None);

    // Existing series aren't looked up again.
    assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
    fixture.scan(&scanner).await;
    assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_metadata_failures_are_not_fatal() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Berserk/v01.cbz"), 1);
    std::fs::create_dir_all(fixture.path("Vagabond")).unwrap();
    let vagabond = MangaMetadata {
        title: "Vagabond".to_string(),
        cover_image: Some("https://cdn.example.com/missing.jpg".to_string()),
        ..Default::default()
    };

    // Lookup errors: series created without metadata.
    let failing = fixture.scanner(Arc::new(StubSource {
        fail_lookups: true,
        ..Default::default()
    }));
    let status = fixture.scan(&failing).await;
    assert!(status.series.iter().all(|s| s.state == SeriesState::Complete));
    let berserk = fixture.repo.find_series(fixture.library.id, "Berserk").await.unwrap().unwrap();
    assert_eq!(berserk.metadata, None);
    assert_eq!(fixture.file_names("Berserk").await, ["v01.cbz"]);

    // Cover download errors: metadata kept, no cover.
    fixture.repo.delete_series(berserk.id).await.unwrap();
    let vagabond_series = fixture.repo.find_series(fixture.library.id, "Vagabond").await.unwrap().unwrap();
    fixture.repo.delete_series(vagabond_series.id).await.unwrap();
    let no_covers = fixture.scanner(Arc::new(StubSource {
        known: Mutex::new(vec![vagabond.clone()]),
        ..Default::default()
    }));
    fixture.scan(&no_covers).await;
    let series = fixture.repo.find_series(fixture.library.id, "Vagabond").await.unwrap().unwrap();
    assert_eq!(series.metadata, Some(vagabond));
    assert_eq!(series.cover, None);
}

#[tokio::test]
async fn test_failing_series_does_not_stop_its_siblings() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Akira/v01.cbz"), 2);
    write_archive(&fixture.path("Berserk/v01.cbz"), 3);
    // Akira is created first and gets id 1. A plain file where its artifact
    // folder belongs means the previews folder can't be created.
    std::fs::create_dir_all(fixture.path(".tankobon/series")).unwrap();
    std::fs::write(fixture.path(".tankobon/series/1"), "in the way").unwrap();
    let scanner = fixture.scanner(Arc::new(StubSource::default()));

    let status = fixture.scan(&scanner).await;
    assert!(!status.in_progress);
    assert_eq!(status.total_series, 2);
    assert_eq!(status.completed_series, 1);
    assert!(status.remaining.is_empty());

    let akira = &status.series[0];
    assert_eq!((akira.name.as_str(), akira.state), ("Akira", SeriesState::Error));
    assert!(akira.error.as_deref().is_some_and(|e| !e.is_empty()));
    let akira_row = fixture.repo.find_series(fixture.library.id, "Akira").await.unwrap().unwrap();
    assert_eq!(akira_row.id, 1);
    assert_eq!(fixture.repo.count_files(akira_row.id).await.unwrap(), 0);

    let berserk = &status.series[1];
    assert_eq!((berserk.name.as_str(), berserk.state), ("Berserk", SeriesState::Complete));
    assert_eq!(berserk.error, None);
    assert_eq!(fixture.file_names("Berserk").await, ["v01.cbz"]);
}

#[tokio::test]
async fn test_sweep_removes_vanished_series() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Berserk/v01.cbz"), 1);
    write_archive(&fixture.path("Vagabond/v01.cbz"), 1);
    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    fixture.scan(&scanner).await;
    let vagabond = fixture.repo.find_series(fixture.library.id, "Vagabond").await.unwrap().unwrap();
    let artifacts = fixture.path(&format!(".tankobon/series/{}", vagabond.id));
    assert!(artifacts.is_dir());

    std::fs::remove_dir_all(fixture.path("Vagabond")).unwrap();
    let status = fixture.scan(&scanner).await;
    assert_eq!(status.total_series, 1);

    let titles: Vec<_> =
        fixture.repo.list_series(fixture.library.id).await.unwrap().into_iter().map(|s| s.title).collect();
    assert_eq!(titles, ["Berserk"]);
    assert_eq!(fixture.repo.count_files(vagabond.id).await.unwrap(), 0);
    assert!(!artifacts.exists());
}

#[tokio::test]
async fn test_sweep_carries_on_past_a_failed_delete() {
    let fixture = Fixture::new().await;
    write_archive(&fixture.path("Akira/v01.cbz"), 1);
    write_archive(&fixture.path("Berserk/v01.cbz"), 1);
    write_archive(&fixture.path("Vagabond/v01.cbz"), 1);
    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    fixture.scan(&scanner).await;

    sqlx::query(
        "CREATE TRIGGER keep_akira BEFORE DELETE ON series WHEN OLD.title = 'Akira' \
         BEGIN SELECT RAISE(ABORT, 'busy'); END",
    )
    .execute(fixture.db.pool())
    .await
    .unwrap();
    std::fs::remove_dir_all(fixture.path("Akira")).unwrap();
    std::fs::remove_dir_all(fixture.path("Vagabond")).unwrap();
    let status = fixture.scan(&scanner).await;
    assert!(!status.in_progress);

    let titles: Vec<_> =
        fixture.repo.list_series(fixture.library.id).await.unwrap().into_iter().map(|s| s.title).collect();
    assert_eq!(titles, ["Akira", "Berserk"]);
}

#[tokio::test]
async fn test_missing_library_root() {
    let fixture = Fixture::new().await;
    let gone = fixture.repo.create_library("Gone", "/definitely/not/here").await.unwrap();
    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    let err = scanner.start_scan(gone.id).await.unwrap_err();
    assert_eq!(*err, ErrorKind::Storage);
    // Nothing was claimed, so nothing is stuck in progress.
    assert_eq!(scanner.status(gone.id).await, None);
}

#[tokio::test]
async fn test_add_and_remove_library() {
    let fixture = Fixture::new().await;
    let other = tempfile::tempdir().unwrap();
    write_archive(&other.path().join("Akira/v01.cbz"), 1);

    let library = add_library(&fixture.repo, " Comics ", other.path()).await.unwrap();
    assert_eq!(library.name, "Comics");
    assert_eq!(library.root_path, std::fs::canonicalize(other.path()).unwrap());

    let err = add_library(&fixture.repo, "Again", other.path()).await.unwrap_err();
    assert!(matches!(*err, ErrorKind::InvalidArgument(_)));
    let err = add_library(&fixture.repo, "Nowhere", "/definitely/not/here").await.unwrap_err();
    assert_eq!(err.http_status(), 400);
    let err = add_library(&fixture.repo, "", other.path()).await.unwrap_err();
    assert!(matches!(*err, ErrorKind::InvalidArgument(_)));

    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    scanner.start_scan(library.id).await.unwrap().handle.await.unwrap();
    assert!(other.path().join(".tankobon").is_dir());

    let removed = remove_library(&fixture.repo, scanner.tracker(), library.id).await.unwrap();
    assert_eq!(removed.id, library.id);
    assert!(!other.path().join(".tankobon").exists());
    // The archives are the user's; they stay.
    assert!(other.path().join("Akira/v01.cbz").is_file());
    assert_eq!(fixture.repo.get_library(library.id).await.unwrap(), None);

    let err = remove_library(&fixture.repo, scanner.tracker(), library.id).await.unwrap_err();
    assert_eq!(*err, ErrorKind::NotFound(library.id));
}

#[tokio::test]
async fn test_library_cannot_be_removed_mid_scan() {
    let fixture = Fixture::new().await;
    std::fs::create_dir_all(fixture.path("Berserk")).unwrap();
    let scanner = fixture.scanner(Arc::new(StubSource::default()));
    let started = scanner.start_scan(fixture.library.id).await.unwrap();

    let err = remove_library(&fixture.repo, scanner.tracker(), fixture.library.id).await.unwrap_err();
    assert_eq!(*err, ErrorKind::AlreadyInProgress(fixture.library.id));

    started.handle.await.unwrap();
    remove_library(&fixture.repo, scanner.tracker(), fixture.library.id).await.unwrap();
}
