mod format;
mod metadata;
mod status;

pub use self::format::FileFormat;
pub use self::metadata::MangaMetadata;
pub use self::status::PublicationStatus;

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace(['.', '-', '_', ' '], "")
}
