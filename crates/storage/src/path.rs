//! Relative path validation.
//!
//! Everything the backend touches is addressed relative to the library root,
//! and nothing is allowed to climb out of it.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Normalize a library-relative path, rejecting anything that would leave the
/// root.
///
/// `.` components and repeated or trailing separators disappear, `..` pops a
/// component as long as there is one to pop. Null bytes and Windows prefixes
/// are rejected, as is a path that normalizes to nothing.
///
/// ```
/// use std::path::Path;
/// use tankobon_storage::validate_path;
///
/// assert_eq!(validate_path("Berserk//./v01.cbz").unwrap(), Path::new("Berserk/v01.cbz"));
/// assert!(validate_path("Berserk/../../etc/passwd").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(path.to_path_buf()));
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Survives Path::components() on Unix, truncates in syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    return Err(invalid());
                }
                components.push(s);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    return Err(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        return Err(invalid());
    }
    Ok(components.into_iter().collect())
}
