//! Filesystem access for tankobon libraries.
//!
//! [`LocalBackend`] reads series folders and writes generated artifacts, and
//! [`layout`] says where those artifacts go.

pub mod error;
pub mod layout;
mod local;
mod path;

pub use crate::local::{FileStream, LocalBackend};
pub use crate::path::validate as validate_path;
