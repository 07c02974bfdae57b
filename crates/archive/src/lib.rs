//! Page counting and first-page previews for comic book archives.
//!
//! - **Reading** through [`ArchiveReader`], which opens zip-family archives
//!   directly and normalizes RAR archives into a zip in a scratch directory
//! - **Page selection** in [`pages`]: image entries only, in a stable,
//!   case-folded reading order
//! - **Previews** via [`Thumbnailer`]: the first page, scaled to fit 512px,
//!   as a progressive JPEG
//!
//! [`Inspector`] ties them together. 7z archives are recognized (so they can
//! be cataloged) but never opened.

pub mod error;
mod inspect;
pub mod pages;
mod reader;
mod thumbnail;

pub use crate::inspect::{DEFAULT_READ_BUFFER_BYTES, Inspection, Inspector};
pub use crate::reader::ArchiveReader;
pub use crate::thumbnail::{DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY, Thumbnailer};
