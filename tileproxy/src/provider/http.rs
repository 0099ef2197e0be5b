//! HTTP client abstraction for testability

use std::io;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tokio_util::io::StreamReader;
use tracing::{debug, trace, warn};

use super::types::{BoxFuture, ProviderError};
use crate::body::{BodySource, TileBody};

/// Default User-Agent string for upstream requests.
pub const DEFAULT_USER_AGENT: &str = concat!("tileproxy/", env!("CARGO_PKG_VERSION"));

/// Default connect timeout for upstream requests.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default overall request timeout for upstream requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest upstream error body echoed into the log.
const MAX_LOGGED_ERROR_BODY: usize = 256;

/// Trait for asynchronous HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests. It is dyn-compatible so one
/// client can be shared by every HTTP-backed provider.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request with extra headers.
    ///
    /// Headers given here override the client's defaults.
    ///
    /// # Returns
    ///
    /// The response body as a stream, or an error for transport failures and
    /// non-success statuses.
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<TileBody, ProviderError>>;
}

/// Async HTTP client implementation using reqwest.
///
/// Built once at startup and shared; reqwest pools connections internally.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default timeouts.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a new AsyncReqwestClient with custom timeouts.
    pub fn with_timeouts(connect: Duration, request: Duration) -> Result<Self, ProviderError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(request)
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(default_headers)
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                ProviderError::Http(format!("Failed to create async HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<TileBody, ProviderError>> {
        Box::pin(async move {
            trace!(url = url, "HTTP GET request starting");

            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            let response = match request.send().await {
                Ok(resp) => {
                    debug!(
                        url = url,
                        status = resp.status().as_u16(),
                        "HTTP response received"
                    );
                    resp
                }
                Err(e) => {
                    warn!(
                        url = url,
                        error = %e,
                        is_connect = e.is_connect(),
                        is_timeout = e.is_timeout(),
                        "HTTP request failed"
                    );
                    return Err(ProviderError::Http(format!("Request failed: {}", e)));
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(url = url, status = status.as_u16(), "HTTP error status");
                debug!(
                    url = url,
                    body = truncate(&body, MAX_LOGGED_ERROR_BODY),
                    "HTTP error body"
                );
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let content_length = response.content_length();
            let stream = response
                .bytes_stream()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
            let body = TileBody::from_reader(StreamReader::new(stream), BodySource::Upstream);

            Ok(match content_length {
                Some(len) => body.with_len_hint(len),
                None => body,
            })
        })
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
