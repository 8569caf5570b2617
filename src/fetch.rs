/// Page fetching behind an injectable trait.
///
/// The crawler and downloader never talk to `reqwest` directly; they take a
/// `PageFetcher`, so tests run against an in-memory fake page graph.
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Errors that can occur while fetching a page.
///
/// Both variants are recoverable at the crawl level: the page is logged and
/// contributes no links.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

/// Trait for HTTP page retrieval.
///
/// Implementations must be `Send + Sync` to allow use behind `Arc`.
pub trait PageFetcher: Send + Sync {
    /// Fetch the body of `url`. Any non-2xx status is an error.
    fn get(&self, url: &Url) -> Result<String, FetchError>;
}

/// Blocking `reqwest` fetcher with an explicit timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn get(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().map_err(|e| FetchError::Network(e.to_string()))
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory fetcher over a fixed URL → body map, for crawler and
    //! downloader tests.
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{FetchError, PageFetcher};
    use url::Url;

    #[derive(Default)]
    pub struct FakeFetcher {
        pages: HashMap<String, String>,
        log: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        /// Every URL fetched, in request order.
        pub fn fetch_log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl PageFetcher for FakeFetcher {
        fn get(&self, url: &Url) -> Result<String, FetchError> {
            self.log.lock().unwrap().push(url.as_str().to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }
}
