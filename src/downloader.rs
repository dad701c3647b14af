use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Failed to download {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to download {url}: server responded with {status}")]
    Status { url: String, status: StatusCode },
}

/// Source of raw image bytes.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, DownloadError>>;
}

pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(concurrency: usize, timeout: Option<Duration>) -> Result<Self, DownloadError> {
        let mut builder = Client::builder().pool_max_idle_per_host(concurrency);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(DownloadError::Client)?;

        Ok(Self { client })
    }
}

impl Fetch for Downloader {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let request_error = |source| DownloadError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        Ok(bytes.to_vec())
    }
}

/// Fetches every url with at most `concurrency` requests in flight, yielding
/// results in input order.
pub fn fetch_in_order<'a, F, I>(
    fetcher: &'a F,
    urls: I,
    concurrency: usize,
) -> impl Stream<Item = Result<Vec<u8>, DownloadError>> + 'a
where
    F: Fetch,
    I: IntoIterator<Item = String>,
    I::IntoIter: 'a,
{
    stream::iter(urls)
        .map(move |url| async move { fetcher.fetch(&url).await })
        .buffered(concurrency.max(1))
}
