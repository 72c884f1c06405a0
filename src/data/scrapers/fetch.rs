//! Payload fetching
//!
//! Fetches provider pages over HTTP. Fetched pages can be kept in an on-disk
//! cache, which is read in offline mode or when the network fails.

use crate::data::table::RawPayload;
use crate::{FetchConfig, FootballError, PayloadFormat, ProviderConfig, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A payload plus where it came from
#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: RawPayload,
    /// False when served from cache; only network fetches are paced
    pub from_network: bool,
}

/// Source of provider payloads
pub trait Fetcher {
    fn fetch(&self, provider: &ProviderConfig) -> Result<Fetched>;
}

/// Retry an operation with exponential backoff
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < attempts => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                std::thread::sleep(Duration::from_millis(100 * 2u64.pow(attempt)));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetcher backed by a blocking HTTP client
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_attempts: u32,
    /// Optional cache directory for fetched payloads
    cache_dir: Option<PathBuf>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpFetcher {
            client,
            max_attempts: config.max_attempts,
            cache_dir: config.cache_dir.as_ref().map(PathBuf::from),
            offline_only: false,
        })
    }

    /// Create fetcher with a cache directory
    pub fn with_cache<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    /// Cache file for a provider, named after it
    fn cache_path(&self, provider: &ProviderConfig) -> Option<PathBuf> {
        let ext = match provider.source.format() {
            PayloadFormat::Csv => "csv",
            PayloadFormat::Html => "html",
        };
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", provider.name, ext)))
    }

    fn load_from_cache(&self, provider: &ProviderConfig) -> Option<String> {
        let path = self.cache_path(provider)?;
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read_to_string(&path).ok()
        } else {
            None
        }
    }

    fn save_to_cache(&self, provider: &ProviderConfig, body: &str) -> Result<()> {
        if let Some(path) = self.cache_path(provider) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, body)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }

    fn download(&self, provider: &ProviderConfig) -> Result<String> {
        let unavailable = |message: String| FootballError::SourceUnavailable {
            provider: provider.name.clone(),
            message,
        };

        let response = with_retry(|| Ok(self.client.get(&provider.url).send()?), self.max_attempts)
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        response.text().map_err(|e| unavailable(e.to_string()))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, provider: &ProviderConfig) -> Result<Fetched> {
        let format = provider.source.format();
        let cached = |body: String| Fetched {
            payload: RawPayload::new(format, body),
            from_network: false,
        };

        if self.offline_only {
            return self.load_from_cache(provider).map(cached).ok_or_else(|| {
                FootballError::SourceUnavailable {
                    provider: provider.name.clone(),
                    message: "offline mode and no cached copy".to_string(),
                }
            });
        }

        // Fixture pages change every matchday, so the cache is only a fallback
        log::info!("Fetching {}", provider.url);
        let body = match self.download(provider) {
            Ok(body) => body,
            Err(e) => match self.load_from_cache(provider) {
                Some(body) => {
                    log::warn!("{}; using cached copy", e);
                    return Ok(cached(body));
                }
                None => return Err(e),
            },
        };

        if let Err(e) = self.save_to_cache(provider, &body) {
            log::warn!("Failed to cache {}: {}", provider.name, e);
        }

        Ok(Fetched {
            payload: RawPayload::new(format, body),
            from_network: true,
        })
    }
}
