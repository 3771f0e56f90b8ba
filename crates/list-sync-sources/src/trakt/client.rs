use crate::error::{ApiError, HttpFailure};
use crate::traits::ListService;
use crate::trakt::rate_limit::{self, RateLimitState, RetryPolicy};
use async_trait::async_trait;
use chrono::Utc;
use list_sync_models::{Category, ListItem, ListPrivacy, ManagedList, MediaIds, MediaKind};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.trakt.tv";
const API_VERSION: &str = "2";
const PAGE_COUNT_HEADER: &str = "x-pagination-page-count";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// App credentials plus the current user tokens.
#[derive(Debug, Clone, Default)]
pub struct TraktCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// A successful response with its body already read.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(ApiError::Decode)
    }

    /// Value of `X-Pagination-Page-Count`, `None` when absent or zero.
    pub fn page_count(&self) -> Option<u32> {
        self.headers
            .get(PAGE_COUNT_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
            .filter(|count| *count > 0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Rate-aware Trakt API executor.
///
/// Every call goes through the same credentials and rate-limit state, so a
/// token swapped in by a refresh is picked up by all later calls.
#[derive(Clone)]
pub struct TraktClient {
    http: Arc<Client>,
    base_url: String,
    credentials: Arc<RwLock<TraktCredentials>>,
    rate_limit: Arc<Mutex<RateLimitState>>,
    retry: RetryPolicy,
}

impl TraktClient {
    pub fn new(credentials: TraktCredentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(credentials: TraktCredentials, base_url: impl Into<String>) -> Self {
        Self {
            http: Arc::new(create_http_client(REQUEST_TIMEOUT)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Arc::new(RwLock::new(credentials)),
            rate_limit: Arc::new(Mutex::new(RateLimitState::default())),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-request timeout, including reading the body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = Arc::new(create_http_client(timeout));
        self
    }

    pub fn client_id(&self) -> String {
        self.read_credentials().client_id.clone()
    }

    pub(crate) fn client_secret(&self) -> String {
        self.read_credentials().client_secret.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_credentials().refresh_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_credentials().access_token.is_some()
    }

    /// Swap in a new token pair for every subsequent call.
    pub fn set_tokens(&self, access_token: String, refresh_token: String) {
        let mut credentials = self
            .credentials
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        credentials.access_token = Some(access_token);
        credentials.refresh_token = Some(refresh_token);
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        *self.rate_limit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get(path).await?.json()
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse, ApiError> {
        let body = serde_json::to_vec(body).map_err(ApiError::Encode)?;
        self.execute(Method::POST, path, Some(body)).await
    }

    /// Single attempt without retries, for callers that interpret 429 themselves.
    pub async fn post_once<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse, ApiError> {
        let body = serde_json::to_vec(body).map_err(ApiError::Encode)?;
        self.wait_for_rate_limit().await;
        self.send(&Method::POST, path, Some(&body)).await
    }

    /// Run a request, waiting out an exhausted budget and retrying transient
    /// failures with exponential backoff.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, ApiError> {
        let mut attempt = 1;
        loop {
            self.wait_for_rate_limit().await;

            match self.send(&method, path, body.as_deref()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt, e.retry_after());
                    warn!(
                        method = %method,
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Trakt request failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn wait_for_rate_limit(&self) {
        let wait = self.rate_limit_state().wait_duration(Utc::now());
        if let Some(wait) = wait {
            info!(
                wait_secs = wait.as_secs(),
                "Trakt rate limit exhausted, waiting for reset"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn send(&self, method: &Method, path: &str, body: Option<&[u8]>) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let (client_id, access_token) = {
            let credentials = self.read_credentials();
            (credentials.client_id.clone(), credentials.access_token.clone())
        };

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header("trakt-api-version", API_VERSION)
            .header("trakt-api-key", client_id);
        if let Some(token) = access_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let now = Utc::now();
        self.rate_limit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .update(&headers, now);

        let body = response.bytes().await?.to_vec();
        debug!(method = %method, path, status = status.as_u16(), bytes = body.len(), "Trakt response");

        if status.is_success() {
            return Ok(ApiResponse { status, headers, body });
        }

        let detail: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        Err(ApiError::from_failure(HttpFailure {
            status: status.as_u16(),
            code: detail.error.filter(|s| !s.is_empty()),
            description: detail.error_description.filter(|s| !s.is_empty()),
            retry_after: rate_limit::retry_after(&headers, now),
        }))
    }

    fn read_credentials(&self) -> std::sync::RwLockReadGuard<'_, TraktCredentials> {
        self.credentials
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for TraktClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraktClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id())
            .field("authenticated", &self.is_authenticated())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn create_http_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(concat!("trakt-sync/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl ListService for TraktClient {
    async fn fetch_ranked(
        &self,
        category: Category,
        kind: MediaKind,
        limit: u32,
        min_rating: u8,
    ) -> Result<Vec<MediaIds>, ApiError> {
        TraktClient::fetch_ranked(self, category, kind, limit, min_rating).await
    }

    async fn ensure_list_exists(
        &self,
        owner: &str,
        list: &ManagedList,
        privacy: ListPrivacy,
    ) -> Result<(), ApiError> {
        TraktClient::ensure_list_exists(self, owner, list, privacy).await
    }

    async fn get_all_items(&self, owner: &str, slug: &str) -> Result<Vec<ListItem>, ApiError> {
        TraktClient::get_all_items(self, owner, slug).await
    }

    async fn add_items(
        &self,
        owner: &str,
        slug: &str,
        ids: &[MediaIds],
        kind: MediaKind,
    ) -> Result<(), ApiError> {
        TraktClient::add_items(self, owner, slug, ids, kind).await
    }

    async fn remove_items(
        &self,
        owner: &str,
        slug: &str,
        ids: &[MediaIds],
        kind: MediaKind,
    ) -> Result<(), ApiError> {
        TraktClient::remove_items(self, owner, slug, ids, kind).await
    }
}
