//! Fetch layer: rendered HTML through the render service.
//!
//! A target is validated against internal hosts, rendered through
//! `GET {RENDER_API_URL}/render?url=..` with retries, and cached briefly by
//! the exact render request. Persistent gateway failures (502/503/504) may
//! fall back to a direct, unrendered fetch; if that fallback fails too, the
//! original error is returned.

mod cache;
mod client;
pub mod guard;
mod retry;

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

pub use cache::HtmlCache;
pub use client::{Headers, HttpClient, HttpResponse, ReqwestClient, DESKTOP_USER_AGENT};
pub use retry::{retry, RetryPolicy};

use crate::error::{Error, Result};
use crate::options::{FetchConfig, Options};

/// HTML of a fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Decoded HTML.
    pub html: String,
    /// The page URL (the validated target).
    pub url: String,
    /// False when the direct-fetch fallback produced the HTML.
    pub rendered: bool,
    /// Served from the render cache.
    pub cached: bool,
}

/// Build the render request URL for `target`.
///
/// # Errors
/// `Config` when `base` is not a valid URL.
pub fn render_url(base: &str, target: &Url, options: &Options) -> Result<String> {
    let endpoint = format!("{}/render", base.trim_end_matches('/'));
    let mut url = Url::parse(&endpoint).map_err(|e| Error::Config(format!("RENDER_API_URL: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("url", target.as_str());
        if let Some(selector) = options.selector.as_deref().filter(|s| !s.trim().is_empty()) {
            query.append_pair("selector", selector);
        }
        if let Some(wait) = options.wait {
            query.append_pair("wait", &wait.to_string());
        }
        if let Some(timeout) = options.timeout {
            query.append_pair("timeout", &timeout.to_string());
        }
        query.append_pair("mode", options.mode.as_str());
    }
    Ok(url.into())
}

/// Render-service client with retry, cache and direct fallback.
pub struct Fetcher {
    client: Arc<dyn HttpClient>,
    cache: HtmlCache,
    config: FetchConfig,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Fetcher over the production `reqwest` transport.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = ReqwestClient::new(&config.user_agent)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Fetcher over any transport.
    #[must_use]
    pub fn with_client(config: FetchConfig, client: Arc<dyn HttpClient>) -> Self {
        Self {
            cache: HtmlCache::new(config.cache_ttl, config.cache_capacity),
            client,
            config,
        }
    }

    /// Shared transport, reused by the manual downloader.
    #[must_use]
    pub fn client(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.client)
    }

    /// Fetch configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The render cache.
    #[must_use]
    pub fn cache(&self) -> &HtmlCache {
        &self.cache
    }

    /// Rendered HTML of `target`.
    ///
    /// # Errors
    /// Input errors (`InvalidUrl`, `BlockedHost`) before any request,
    /// `MissingConfig` without a render endpoint, and the last upstream
    /// error once retries (and the optional direct fallback) are exhausted.
    pub async fn fetch_page(&self, target: &str, options: &Options) -> Result<FetchedPage> {
        let url = guard::validate_target(target)?;
        if self.config.resolve_hosts {
            guard::check_resolved(&url).await?;
        }

        let base = self
            .config
            .render_api_url
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or(Error::MissingConfig("RENDER_API_URL"))?;
        let request_url = render_url(base, &url, options)?;

        if let Some(html) = self.cache.get(&request_url) {
            debug!(url = %url, "render cache hit");
            return Ok(FetchedPage {
                html: html.to_string(),
                url: url.to_string(),
                rendered: true,
                cached: true,
            });
        }

        let mut headers = Headers::new();
        if let Some(token) = self.config.render_api_token.as_deref().filter(|t| !t.trim().is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token.trim())));
        }

        let rendered = self.render(&request_url, &headers, url.as_str()).await;
        match rendered {
            Ok(html) => {
                self.cache.insert(request_url, html.as_str());
                Ok(FetchedPage {
                    html,
                    url: url.to_string(),
                    rendered: true,
                    cached: false,
                })
            }
            Err(err) if self.config.direct_fallback && err.is_gateway_failure() => {
                warn!(url = %url, error = %err, "render service unavailable, fetching directly");
                match self.fetch_direct(&url).await {
                    Ok(page) => Ok(page),
                    Err(fallback_err) => {
                        warn!(url = %url, error = %fallback_err, "direct fetch failed");
                        Err(err)
                    }
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn render(&self, request_url: &str, headers: &[(String, String)], target: &str) -> Result<String> {
        let client = &self.client;
        let timeout = self.config.attempt_timeout;
        let max_bytes = self.config.max_bytes;

        let response = retry(&self.config.retry, Error::is_retryable, |attempt| async move {
            debug!(url = target, attempt, "render request");
            let response = client.get(request_url, headers, timeout, max_bytes).await?;
            if response.is_success() {
                Ok(response)
            } else {
                Err(Error::Upstream {
                    status: response.status,
                    url: target.to_string(),
                })
            }
        })
        .await?;

        info!(url = target, bytes = response.body.len(), "rendered");
        Ok(response.text())
    }

    /// Single unrendered GET of the target with browser headers.
    async fn fetch_direct(&self, url: &Url) -> Result<FetchedPage> {
        let headers: Headers = vec![
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
        ];
        let response = self
            .client
            .get(url.as_str(), &headers, self.config.attempt_timeout, self.config.max_bytes)
            .await?;
        if !response.is_success() {
            return Err(Error::Upstream {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(FetchedPage {
            html: response.text(),
            url: url.to_string(),
            rendered: false,
            cached: false,
        })
    }
}
