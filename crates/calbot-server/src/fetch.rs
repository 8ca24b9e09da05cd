//! Retrieval of guide pages.

use std::future::Future;
use std::pin::Pin;

use axum::body::Bytes;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// A boxed future for async trait methods, so [`GuideSource`] stays
/// object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can produce the raw markup of a guide page.
pub trait GuideSource: Send + Sync {
    /// Fetches the page at `url`.
    ///
    /// # Errors
    ///
    /// [`ServerError::Fetch`] or [`ServerError::UpstreamStatus`] when the page
    /// cannot be retrieved.
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, ServerResult<Bytes>>;
}

/// Fetches guides over HTTP.
#[derive(Debug, Clone)]
pub struct GuideFetcher {
    client: reqwest::Client,
}

impl GuideFetcher {
    /// Builds a client with the configured user agent and timeout.
    pub fn new(config: &ServerConfig) -> ServerResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client })
    }

    #[instrument(skip(self, url), fields(url = %url))]
    async fn get(&self, url: &Url) -> ServerResult<Bytes> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServerError::upstream_status(url.as_str(), status.as_u16()));
        }
        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Fetched guide");
        Ok(body)
    }
}

impl GuideSource for GuideFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, ServerResult<Bytes>> {
        Box::pin(self.get(url))
    }
}
