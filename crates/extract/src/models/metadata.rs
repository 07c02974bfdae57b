use super::PublicationStatus;
use time::Date;

#[cfg(feature = "serde")]
time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Series metadata fetched from an external provider when a series is first
/// discovered.
///
/// Every optional field is mapped explicitly; a provider that doesn't know a
/// value yields `None` or an empty list, never a missing key.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct MangaMetadata {
    /// Which provider this came from (e.g. `jikan`).
    pub provider: String,
    /// The provider's own ID for the series.
    pub provider_id: u64,
    /// Canonical title
    pub title: String,
    /// Every title the provider knows (including the canonical one)
    pub titles: Vec<String>,
    pub synopsis: Option<String>,
    pub background: Option<String>,
    /// Remote URL of the cover art
    pub cover_image: Option<String>,
    pub authors: Vec<String>,
    pub demographics: Vec<String>,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub score: Option<f64>,
    /// Provider page for the series
    pub url: Option<String>,
    pub total_volumes: Option<u32>,
    pub total_chapters: Option<u32>,
    #[cfg_attr(feature = "serde", serde(with = "iso_date::option"))]
    pub published_from: Option<Date>,
    #[cfg_attr(feature = "serde", serde(with = "iso_date::option"))]
    pub published_to: Option<Date>,
    pub status: Option<PublicationStatus>,
}
impl MangaMetadata {
    /// Case-insensitive exact match against any known title.
    pub fn has_title(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        std::iter::once(&self.title).chain(&self.titles).any(|t| t.trim().to_lowercase() == query)
    }
}
