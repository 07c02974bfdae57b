use crate::error::{ErrorKind, Result};
use crate::jikan::{self, PROVIDER};
use crate::source::{MetadataSource, check_query};
use crate::Selector;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, Url};
use std::time::Duration;
use tankobon_asyncutils::RateLimiter;
use tankobon_extract::models::MangaMetadata;
use tracing::instrument;

/// Jikan-backed metadata lookups.
///
/// Every lookup queues behind the shared [`RateLimiter`]; clones of the
/// resolver share it too. Cover downloads go to the CDN and skip the queue.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    base_url: Url,
    limiter: RateLimiter,
}
impl Resolver {
    /// `base_url` is the API root, e.g. `https://api.jikan.moe/v4`.
    pub fn new(base_url: &str, timeout: Duration, limiter: RateLimiter) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .or_raise(|| ErrorKind::InvalidArgument(format!("invalid base URL {base_url:?}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidArgument(format!("base URL must be http(s): {base_url}")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tankobon/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client, base_url, limiter })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// `{base}/manga/{id}` or `{base}/manga?q={title}`.
    pub fn request_url(&self, selector: Selector, query: &str) -> Result<Url> {
        let query = check_query(query)?;
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = match selector {
            Selector::Id => {
                let id: u64 = query
                    .parse::<u64>()
                    .or_raise(|| ErrorKind::InvalidArgument(format!("not a provider id: {query:?}")))?;
                Url::parse(&format!("{base}/manga/{id}"))
            },
            Selector::Title => Url::parse_with_params(&format!("{base}/manga"), &[("q", query)]),
        };
        url.or_raise(|| ErrorKind::InvalidArgument(format!("could not build a URL for {query:?}")))
    }

    /// Send a GET through the rate limiter and decode the body. Any failure
    /// along the way is logged and comes back as `None`.
    async fn fetch(&self, url: Url) -> Option<jikan::Response> {
        let client = self.client.clone();
        let request = url.clone();
        let response = match self.limiter.schedule(move || async move { client.get(request).send().await }).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                tracing::warn!(url = %url, error = %err, "Metadata request failed");
                return None;
            },
            Err(err) => {
                tracing::warn!(url = %url, error = %*err, "Metadata request never ran");
                return None;
            },
        };
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Metadata provider returned an error");
            return None;
        }
        match response.json::<jikan::Response>().await {
            Ok(body) => Some(body),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "Could not decode metadata response");
                None
            },
        }
    }
}

#[async_trait]
impl MetadataSource for Resolver {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn resolve(&self, selector: Selector, query: &str) -> Result<Option<MangaMetadata>> {
        let url = self.request_url(selector, query)?;
        let Some(body) = self.fetch(url).await else {
            return Ok(None);
        };
        let candidates = body.into_candidates();
        let count = candidates.len();
        match jikan::select(candidates, query.trim()) {
            Some(metadata) => {
                tracing::debug!(candidates = count, provider_id = metadata.provider_id, title = %metadata.title, "Resolved metadata");
                Ok(Some(metadata))
            },
            None => {
                tracing::info!("No metadata found");
                Ok(None)
            },
        }
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.or_raise(|| ErrorKind::Request(url.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        let bytes = response.bytes().await.or_raise(|| ErrorKind::Request(url.to_string()))?;
        tracing::debug!(bytes = bytes.len(), "Downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tankobon_asyncutils::RatePolicy;

    fn resolver(base: &str) -> Resolver {
        Resolver::new(base, Duration::from_secs(5), RateLimiter::new(RatePolicy::default())).unwrap()
    }

    #[rstest]
    #[case(Selector::Id, "2", "https://api.jikan.moe/v4/manga/2")]
    #[case(Selector::Id, " 13 ", "https://api.jikan.moe/v4/manga/13")]
    #[case(Selector::Title, "Berserk", "https://api.jikan.moe/v4/manga?q=Berserk")]
    #[case(Selector::Title, "Spy x Family", "https://api.jikan.moe/v4/manga?q=Spy+x+Family")]
    #[case(Selector::Title, "Fate/Zero & co", "https://api.jikan.moe/v4/manga?q=Fate%2FZero+%26+co")]
    fn test_request_url(#[case] selector: Selector, #[case] query: &str, #[case] expected: &str) {
        let url = resolver("https://api.jikan.moe/v4/").request_url(selector, query).unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case(Selector::Id, "Berserk")]
    #[case(Selector::Id, "-1")]
    #[case(Selector::Title, "")]
    #[case(Selector::Id, "   ")]
    fn test_request_url_rejects(#[case] selector: Selector, #[case] query: &str) {
        let err = resolver("https://api.jikan.moe/v4").request_url(selector, query).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://api.jikan.moe/v4")]
    fn test_new_rejects_base_url(#[case] base: &str) {
        let err = Resolver::new(base, Duration::from_secs(1), RateLimiter::new(RatePolicy::default())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
    }
}
