//! Series metadata from external providers.
//!
//! The scanner only sees [`MetadataSource`]. [`Resolver`] talks to Jikan
//! through a shared rate limiter, [`Offline`] doesn't talk to anyone.

pub mod error;
mod jikan;
mod resolver;
mod selector;
mod source;

pub use crate::resolver::Resolver;
pub use crate::selector::Selector;
pub use crate::source::{MetadataSource, Offline};
