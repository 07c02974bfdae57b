//! Jikan (MyAnimeList) response shapes and how they map onto
//! [`MangaMetadata`].
//!
//! Only the fields we keep are modelled. Jikan happily returns `null` for
//! anything it doesn't know, so everything is optional or defaults to empty.

use serde::Deserialize;
use std::str::FromStr;
use tankobon_extract::models::{MangaMetadata, PublicationStatus};
use time::Date;
use time::macros::format_description;

pub(crate) const PROVIDER: &str = "jikan";

/// `/manga?q=` answers with a list, `/manga/{id}` with a single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Data {
    Many(Vec<Manga>),
    One(Box<Manga>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    pub data: Data,
}
impl Response {
    pub fn into_candidates(self) -> Vec<Manga> {
        match self.data {
            Data::Many(list) => list,
            Data::One(one) => vec![*one],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Manga {
    pub mal_id: u64,
    pub url: Option<String>,
    pub images: Option<Images>,
    pub title: Option<String>,
    pub titles: Vec<Title>,
    pub chapters: Option<u32>,
    pub volumes: Option<u32>,
    pub status: Option<String>,
    pub published: Option<Published>,
    pub score: Option<f64>,
    pub synopsis: Option<String>,
    pub background: Option<String>,
    pub authors: Vec<Named>,
    pub genres: Vec<Named>,
    pub themes: Vec<Named>,
    pub demographics: Vec<Named>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Images {
    pub jpg: Option<ImageUrls>,
    pub webp: Option<ImageUrls>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ImageUrls {
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Title {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Published {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Named {
    pub name: String,
}

fn names(list: Vec<Named>) -> Vec<String> {
    list.into_iter().map(|n| n.name).filter(|n| !n.is_empty()).collect()
}

/// `1989-08-25T00:00:00+00:00`, but only the date matters.
fn date(timestamp: Option<String>) -> Option<Date> {
    let timestamp = timestamp?;
    let day = timestamp.get(..10)?;
    match Date::parse(day, format_description!("[year]-[month]-[day]")) {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::debug!(timestamp = %timestamp, error = %err, "Ignoring unparseable publication date");
            None
        },
    }
}

fn status(label: Option<String>) -> Option<PublicationStatus> {
    let label = label?;
    match PublicationStatus::from_str(&label) {
        Ok(status) => Some(status),
        Err(_) => {
            tracing::debug!(status = %label, "Ignoring unknown publication status");
            None
        },
    }
}

impl From<Manga> for MangaMetadata {
    fn from(manga: Manga) -> Self {
        let cover_image = manga.images.and_then(|images| {
            let webp = images.webp.and_then(|urls| urls.image_url);
            webp.or_else(|| images.jpg.and_then(|urls| urls.image_url))
        });
        let published = manga.published.unwrap_or_default();
        MangaMetadata {
            provider: PROVIDER.to_string(),
            provider_id: manga.mal_id,
            title: manga.title.unwrap_or_default(),
            titles: manga.titles.into_iter().map(|t| t.title).collect(),
            synopsis: manga.synopsis,
            background: manga.background,
            cover_image,
            authors: names(manga.authors),
            demographics: names(manga.demographics),
            genres: names(manga.genres),
            themes: names(manga.themes),
            score: manga.score,
            url: manga.url,
            total_volumes: manga.volumes,
            total_chapters: manga.chapters,
            published_from: date(published.from),
            published_to: date(published.to),
            status: status(manga.status),
        }
    }
}

/// First candidate with an exact (case-insensitive) title match, otherwise
/// whatever the provider ranked first.
pub(crate) fn select(candidates: Vec<Manga>, query: &str) -> Option<MangaMetadata> {
    let mut candidates: Vec<MangaMetadata> = candidates.into_iter().map(MangaMetadata::from).collect();
    if candidates.is_empty() {
        return None;
    }
    let index = candidates.iter().position(|c| c.has_title(query)).unwrap_or(0);
    Some(candidates.swap_remove(index))
}
