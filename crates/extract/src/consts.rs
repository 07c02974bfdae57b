use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Volume patterns, most explicit first. The terse `v12` form only counts when
// the `v` starts a word, otherwise "Preview 2" would be volume 2.
regex!(VOLUME_LONG_REGEX, r"(?i)vol(?:ume)?\.?\s*(\d+)");
regex!(VOLUME_PAREN_REGEX, r"(?i)\(v(\d+)\)");
regex!(VOLUME_TERSE_REGEX, r"(?i)(?:^|[^a-zA-Z])v\.?\s*(\d+)");

// Chapter patterns. Same rule for the terse `c12` form.
regex!(CHAPTER_LONG_REGEX, r"(?i)ch(?:apter)?\.?\s*(\d+(?:\.\d+)?)");
regex!(CHAPTER_TERSE_REGEX, r"(?i)(?:^|[^a-zA-Z])c\.?\s*(\d+(?:\.\d+)?)");

pub(crate) static VOLUME_PATTERNS: [&LazyLock<Regex>; 3] = [&VOLUME_LONG_REGEX, &VOLUME_PAREN_REGEX, &VOLUME_TERSE_REGEX];
pub(crate) static CHAPTER_PATTERNS: [&LazyLock<Regex>; 2] = [&CHAPTER_LONG_REGEX, &CHAPTER_TERSE_REGEX];
