//! HTTP transport seam.
//!
//! Every network read in the crate goes through [`HttpClient`], so tests can
//! swap in canned responses. [`ReqwestClient`] is the production transport:
//! it enforces the per-request timeout and stops reading as soon as a body
//! grows past its byte cap.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::redirect::Policy;
use url::Host;

use super::guard;
use crate::encoding;
use crate::error::{Error, Result};

/// Desktop browser user agent for direct and manual fetches.
pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Header list passed to a request.
pub type Headers = Vec<(String, String)>;

const MAX_REDIRECTS: usize = 10;

/// A fully buffered response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// URL after redirects.
    pub final_url: String,
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// `Content-Disposition` header.
    pub content_disposition: Option<String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded to UTF-8 using the declared or sniffed charset.
    #[must_use]
    pub fn text(&self) -> String {
        encoding::decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Minimal async GET transport.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` with extra `headers`. The whole exchange, body included, must
    /// finish within `timeout` and the body must not exceed `max_bytes`.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client sending `user_agent` by default.
    ///
    /// Redirects to internal IP literals are refused.
    pub fn new(user_agent: &str) -> Result<Self> {
        let redirect = Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            let blocked = match attempt.url().host() {
                Some(Host::Ipv4(ip)) => guard::is_blocked_ip(&ip.into()),
                Some(Host::Ipv6(ip)) => guard::is_blocked_ip(&ip.into()),
                _ => false,
            };
            if blocked {
                attempt.error("redirect to internal address blocked")
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(redirect)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str, headers: &[(String, String)], max_bytes: usize) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let mut response = request.send().await?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let content_disposition = header(CONTENT_DISPOSITION);
        let declared_len = header(CONTENT_LENGTH).and_then(|v| v.parse::<usize>().ok());
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        if declared_len.is_some_and(|len| len > max_bytes) {
            return Err(Error::TooLarge { limit: max_bytes });
        }

        let mut body = Vec::with_capacity(declared_len.unwrap_or(0).min(max_bytes));
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > max_bytes {
                return Err(Error::TooLarge { limit: max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            final_url,
            content_type,
            content_disposition,
            body,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<HttpResponse> {
        tokio::time::timeout(timeout, self.fetch(url, headers, max_bytes))
            .await
            .map_err(|_| Error::Timeout(timeout.as_millis()))?
    }
}
