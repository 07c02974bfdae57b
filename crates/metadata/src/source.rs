use crate::Selector;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use tankobon_extract::models::MangaMetadata;

/// Anything that can look up series metadata and fetch the artwork it points
/// at.
///
/// `resolve` is best-effort: a provider that is down, rate limiting us, or
/// simply doesn't know the series answers `Ok(None)`. Errors are reserved for
/// requests that could never succeed.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Short provider name, for logs.
    fn name(&self) -> &str;

    async fn resolve(&self, selector: Selector, query: &str) -> Result<Option<MangaMetadata>>;

    /// Fetch the raw bytes behind a URL the provider handed out (cover art).
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Never looks anything up. For when lookups are switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl MetadataSource for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    async fn resolve(&self, _selector: Selector, query: &str) -> Result<Option<MangaMetadata>> {
        check_query(query)?;
        Ok(None)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        exn::bail!(ErrorKind::InvalidArgument(format!("offline, not downloading {url}")))
    }
}

pub(crate) fn check_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        exn::bail!(ErrorKind::InvalidArgument("query cannot be empty".to_string()));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline() {
        assert_eq!(Offline.resolve(Selector::Title, "Berserk").await.unwrap(), None);
        let err = Offline.resolve(Selector::Title, "  ").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
        assert!(Offline.download("https://example.com/cover.jpg").await.is_err());
    }
}
