//! # HTTP API Client
//!
//! An asynchronous API client wrapper around `reqwest`. Every call made through
//! [`ApiClient::request`] is routed through the resilient fetch loop (bounded
//! retries, linear backoff, per-attempt timeout) and shows up in the client's
//! [`LoadingTracker`] while it runs.
//!
//! [`ApiClient::make_request`] is the single-attempt variant keyed by a caller
//! id: starting a new request under the same id cancels the previous one.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::loading::{LoadingSet, LoadingTracker};
use crate::core::registry::RequestRegistry;
use crate::retrieve::resilient::{fetch_with_retry, FetchError, RetryPolicy, TransportError};

pub struct ApiClient {
    inner: reqwest::Client,
    /// Always ends with `/`, so relative paths join below it.
    base_url: Url,
    auth_token: Option<String>,
    default_headers: HeaderMap,
    policy: RetryPolicy,
    requests: RequestRegistry,
    loading: Arc<LoadingTracker>,
    next_request: AtomicU64,
}

impl ApiClient {
    /// Creates a client for `base_url` (e.g. `https://api.example.com/v1`).
    ///
    /// # Errors
    /// Returns the parse error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: reqwest::Client::new(),
            base_url,
            auth_token,
            default_headers: HeaderMap::new(),
            policy: RetryPolicy::default(),
            requests: RequestRegistry::new(),
            loading: Arc::new(LoadingTracker::new()),
            next_request: AtomicU64::new(0),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Headers sent with every request.
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Reports calls to a shared tracker instead of the client's own.
    pub fn with_loading_tracker(mut self, loading: Arc<LoadingTracker>) -> Self {
        self.loading = loading;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn loading(&self) -> &Arc<LoadingTracker> {
        &self.loading
    }

    /// Performs exactly one HTTP exchange.
    ///
    /// `path` is resolved against the base URL; a leading `/` is ignored so
    /// that `"/users"` and `"users"` hit the same endpoint.
    ///
    /// # Errors
    /// - [`TransportError::Status`] for any non-2xx response.
    /// - [`TransportError::Network`] when the request could not be sent.
    /// - [`TransportError::Decode`] when the body is not the expected JSON.
    pub async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, TransportError> {
        let full_url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Network(format!("invalid path '{}': {}", path, e)))?;

        let mut req = self
            .inner
            .request(method, full_url)
            .headers(self.default_headers.clone());

        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Sends a request under the client's retry policy.
    ///
    /// The call is tracked as `"{endpoint}-{millis}-{seq}"` in the loading
    /// tracker until it settles, successfully or not. `seq` counts the
    /// client's calls, so concurrent calls never share a key.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, FetchError> {
        let seq = self.next_request.fetch_add(1, Ordering::Relaxed);
        let request_id = format!(
            "{}-{}-{}",
            endpoint,
            chrono::Utc::now().timestamp_millis(),
            seq
        );
        let _busy = self.loading.track(&request_id);

        let never = CancellationToken::new();
        let method = &method;
        let result = fetch_with_retry(
            move |_| self.send_once::<T>(method.clone(), endpoint, body),
            &self.policy,
            &never,
        )
        .await;

        if let Err(err) = &result {
            log::error!("API error on {}: {}", endpoint, err);
        }
        result
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, FetchError> {
        self.request(Method::GET, endpoint, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, FetchError> {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    pub async fn get_user_profile<T: DeserializeOwned>(
        &self,
        user_id: impl Display,
    ) -> Result<T, FetchError> {
        self.get(&format!("/users/{}", user_id)).await
    }

    pub async fn search_users<T: DeserializeOwned>(&self, query: &str) -> Result<T, FetchError> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.get(&format!("/users/search?q={}", encoded)).await
    }

    pub async fn create_user<T: DeserializeOwned>(&self, data: &Value) -> Result<T, FetchError> {
        self.post("/users", data).await
    }

    /// Single GET attempt registered under `id`.
    ///
    /// Returns `Ok(None)` if a later call with the same id, or
    /// [`cancel_request`](Self::cancel_request), cancelled this one.
    pub async fn make_request<T: DeserializeOwned>(
        &self,
        id: &str,
        endpoint: &str,
    ) -> Result<Option<T>, TransportError> {
        self.requests
            .start(id, |_cancel| self.send_once(Method::GET, endpoint, None))
            .await
    }

    pub fn cancel_request(&self, id: &str) -> bool {
        self.requests.cancel(id)
    }

    pub fn cancel_all_requests(&self) {
        self.requests.cancel_all();
    }

    pub fn loading_status(&self) -> LoadingSet {
        self.loading.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.active_count() > 0
    }
}
