use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    str::FromStr,
};

use super::sanitize;
use crate::error::{Error, ErrorKind};

/// Container formats the scanner catalogs, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum FileFormat {
    Zip,
    /// Comic book zip.
    Cbz,
    Rar,
    /// Comic book RAR.
    Cbr,
    SevenZip,
    /// Comic book 7z.
    Cb7,
}
impl FileFormat {
    pub const ALL: [FileFormat; 6] = [Self::Zip, Self::Cbz, Self::Rar, Self::Cbr, Self::SevenZip, Self::Cb7];

    /// The canonical (lowercase) extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Zip => "zip",
            FileFormat::Cbz => "cbz",
            FileFormat::Rar => "rar",
            FileFormat::Cbr => "cbr",
            FileFormat::SevenZip => "7z",
            FileFormat::Cb7 => "cb7",
        }
    }

    /// Detect the format from a path's extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref().extension().and_then(|ext| ext.to_str()).and_then(|ext| ext.parse().ok())
    }

    pub fn is_zip_family(&self) -> bool {
        matches!(self, Self::Zip | Self::Cbz)
    }

    pub fn is_rar_family(&self) -> bool {
        matches!(self, Self::Rar | Self::Cbr)
    }

    pub fn is_7z_family(&self) -> bool {
        matches!(self, Self::SevenZip | Self::Cb7)
    }
}
impl TryFrom<String> for FileFormat {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}
impl FromStr for FileFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "zip" => Self::Zip,
            "cbz" => Self::Cbz,
            "rar" => Self::Rar,
            "cbr" => Self::Cbr,
            "7z" | "sevenzip" => Self::SevenZip,
            "cb7" => Self::Cb7,
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        })
    }
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.extension())
    }
}
