//! Page Selection and Ordering

use std::cmp::Ordering;
use std::path::Path;

/// File extensions (lowercase) that count as pages.
///
/// AVIF pages are counted, but `image` is built without an AVIF decoder (it
/// needs the native dav1d library). An archive whose *first* page is AVIF gets
/// no preview and fails inspection with [`Decode`](crate::error::ErrorKind::Decode).
pub const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "avif", "tiff"];

/// A page inside an archive: its position in the container and its entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub name: String,
}

/// Whether an archive entry name looks like a page image.
pub fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Reading order for page names: case-folded lexicographic comparison, with
/// the raw name as a tie-breaker.
///
/// This is *not* a natural sort, `p10` comes before `p2`. Archives from anyone
/// who cares are zero-padded anyway.
///
/// Nor is it a locale collation. Names compare by code point once lowercased,
/// so punctuation lands wherever ASCII puts it: `a1` sorts before `a_1`, where
/// ICU would put `a_1` first.
pub fn compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Sort pages into reading order. The sort is stable, so exact duplicates keep
/// their archive order.
pub fn sort(pages: &mut [Page]) {
    pages.sort_by(|a, b| compare(&a.name, &b.name));
}
