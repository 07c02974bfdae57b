//! Filename Numbering

use crate::consts;
use crate::models::FileFormat;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::instrument;

/// Ordering information recovered from an archive's file name.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Numbering {
    pub volume: Option<u32>,
    /// Chapters can be fractional: `Chapter 10.5` is a real thing.
    pub chapter: Option<f32>,
}
impl Numbering {
    /// Volume as it's stored in the catalog, where "unknown" is zero.
    pub fn volume_or_default(&self) -> u32 {
        self.volume.unwrap_or_default()
    }

    /// Chapter as it's stored in the catalog, where "unknown" is zero.
    pub fn chapter_or_default(&self) -> f32 {
        self.chapter.unwrap_or_default()
    }
}

/// Extract the volume and chapter numbers from an archive's file name.
///
/// Accepts either a bare file name or a path. Parent directories are ignored,
/// and so is an archive extension (looking at you, `.7z`). Anything else after
/// the last dot stays, since `Chapter 10.5` has no extension. Each number is taken from the first pattern
/// that matches, in this order:
///
/// - Volume: `Vol 12`, `Volume 12`, `vol.12`, then `(v12)`, then a terse `v12`
///   or `v.12` that isn't part of a larger word.
/// - Chapter: `Ch 12.5`, `Chapter 12`, `ch.12`, then a terse `c12.5`, again
///   not part of a larger word.
///
/// Matching is case-insensitive. Numbers that don't fit their type are
/// treated as absent.
#[instrument(level = "trace")]
pub fn parse_filename(file_name: &str) -> Numbering {
    let path = Path::new(file_name);
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or(file_name);
    let stem = match FileFormat::from_path(path) {
        Some(_) => path.file_stem().and_then(|s| s.to_str()).unwrap_or(name),
        None => name,
    };
    Numbering {
        volume: first_capture(&consts::VOLUME_PATTERNS, stem).and_then(|v| v.parse().ok()),
        chapter: first_capture(&consts::CHAPTER_PATTERNS, stem)
            .and_then(|c| c.parse::<f32>().ok())
            .filter(|c| c.is_finite()),
    }
}

fn first_capture<'h>(patterns: &[&LazyLock<Regex>], haystack: &'h str) -> Option<&'h str> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(haystack))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
