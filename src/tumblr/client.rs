use crate::paginate::PageRequest;
use crate::tumblr::oauth::{authorization_header, Nonce, OAuthCredentials};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.tumblr.com";

const DASHBOARD_PATH: &str = "/v2/user/dashboard";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving a dashboard page.
///
/// Every variant is fatal for the run: no retries are attempted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Sending the request or reading its body exceeded the 30-second deadline
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not the `{"response": {"posts": [...]}}` envelope
    #[error("Unexpected response body: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("Insecure API base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

/// Anything that can hand back one page of raw dashboard posts.
///
/// Posts are returned undecoded so callers can dump exactly what the API sent.
pub trait DashboardSource {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<Vec<Value>, FetchError>> + Send;
}

#[derive(Deserialize)]
struct Envelope {
    response: EnvelopeBody,
}

#[derive(Deserialize)]
struct EnvelopeBody {
    posts: Vec<Value>,
}

/// Tumblr v2 API client signing every request with the user's OAuth tokens.
pub struct TumblrClient {
    http: reqwest::Client,
    dashboard_url: Url,
    credentials: OAuthCredentials,
    timeout: Duration,
}

impl TumblrClient {
    /// Creates a client against `base_url` (normally [`DEFAULT_API_BASE_URL`]).
    ///
    /// HTTPS is required so the signed request never crosses the network in
    /// the clear; plain HTTP is allowed only for localhost.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: OAuthCredentials,
    ) -> Result<Self, FetchError> {
        let base = Url::parse(base_url)?;
        if base.scheme() != "https" {
            let is_localhost = matches!(base.host_str(), Some("localhost") | Some("127.0.0.1"));
            if base.scheme() != "http" || !is_localhost {
                tracing::error!(base_url = %base_url, "Rejecting non-HTTPS API base URL");
                return Err(FetchError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base_url, "Using non-HTTPS API base URL (localhost only)");
        }

        let dashboard_url = base.join(DASHBOARD_PATH)?;
        Ok(Self {
            http,
            dashboard_url,
            credentials,
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Overrides the per-page deadline, which covers sending the request and
    /// reading the whole body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn page_url(&self, request: PageRequest) -> Url {
        let mut url = self.dashboard_url.clone();
        url.query_pairs_mut()
            .append_pair("offset", &request.offset.to_string())
            .append_pair("limit", &request.limit.to_string());
        url
    }
}

impl DashboardSource for TumblrClient {
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<Value>, FetchError> {
        let url = self.page_url(request);
        let auth = authorization_header(&self.credentials, "GET", &url, &Nonce::generate())
            .map_err(|e| FetchError::Signing(e.to_string()))?;

        tracing::debug!(offset = request.offset, limit = request.limit, url = %url, "Fetching dashboard page");

        let http_request = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, auth);
        let bytes = tokio::time::timeout(self.timeout, send_and_read(http_request))
            .await
            .map_err(|_| FetchError::Timeout)??;
        let envelope: Envelope = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            offset = request.offset,
            received = envelope.response.posts.len(),
            "Dashboard page received"
        );
        Ok(envelope.response.posts)
    }
}

async fn send_and_read(request: reqwest::RequestBuilder) -> Result<Vec<u8>, FetchError> {
    let mut response = request.send().await.map_err(transport_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    // Content-Length is only a hint; the running total is what is enforced
    if response
        .content_length()
        .is_some_and(|len| len > MAX_RESPONSE_SIZE as u64)
    {
        return Err(FetchError::ResponseTooLarge);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
        if body.len() + chunk.len() > MAX_RESPONSE_SIZE {
            return Err(FetchError::ResponseTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// A deadline set on the `reqwest::Client` itself surfaces as a reqwest error.
fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err)
    }
}

/// Retrieves every page in `plan` and concatenates the posts in plan order.
///
/// Up to `concurrency` requests are in flight at once; results are still
/// joined strictly by offset. The first failure aborts the whole fetch.
pub async fn fetch_dashboard<S: DashboardSource + Sync>(
    source: &S,
    plan: &[PageRequest],
    concurrency: usize,
) -> Result<Vec<Value>, FetchError> {
    let total: u32 = plan.iter().map(|r| r.limit).sum();
    tracing::info!(
        posts = total,
        queries = plan.len(),
        "Retrieving {} posts ({} API queries)",
        total,
        plan.len()
    );

    let pages: Vec<Vec<Value>> = stream::iter(plan.iter().copied().enumerate())
        .map(move |(i, request)| {
            tracing::debug!(
                iteration = i + 1,
                of = plan.len(),
                offset = request.offset,
                limit = request.limit,
                "Queueing dashboard request"
            );
            source.fetch_page(request)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(pages.into_iter().flatten().collect())
}
