//! Everything the catalog knows about an archive without opening it: its
//! [`FileFormat`](models::FileFormat), the volume/chapter [`Numbering`]
//! hidden in its name, and the [`MangaMetadata`](models::MangaMetadata)
//! shape that series metadata is stored in.

mod consts;
pub mod error;
pub mod models;
mod parse;

pub use crate::parse::{Numbering, parse_filename};
