// API client - the single path every outbound request takes
use crate::budget::{CallBudget, CancelReason};
use crate::constants;
use crate::dispatch::{NoProgress, ProgressObserver};
use crate::error::{ApiError, Result};
use crate::model;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything that used to be process-wide state: server, key and limits.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Requests are always sent to this scheme, host and port
    pub base_url: Url,
    pub key: String,
    /// Minimum remaining calls before the run is cancelled
    pub threshold: u64,
    pub page_size: usize,
    /// Covers one call including all of its retries
    pub request_timeout: Duration,
    /// The Nth retry waits N times this
    pub backoff_step: Duration,
    pub workers: usize,
}

impl ClientConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            base_url: Url::parse(constants::DEFAULT_API_URL)
                .expect("DEFAULT_API_URL is a valid absolute URL"),
            key: key.into(),
            threshold: constants::DEFAULT_THRESHOLD,
            page_size: constants::PAGE_SIZE,
            request_timeout: Duration::from_secs(constants::REQUEST_TIMEOUT_SECS),
            backoff_step: Duration::from_secs(constants::BACKOFF_STEP_SECS),
            workers: constants::default_workers(),
        }
    }

    /// Set the API server. A bare host name is treated as `https://<host>`.
    pub fn with_server(mut self, server: &str) -> Result<Self> {
        let server = server.trim();
        let candidate = if server.contains("://") {
            server.to_string()
        } else {
            format!("https://{}", server)
        };
        self.base_url = Url::parse(&candidate).map_err(|source| ApiError::InvalidUrl {
            target: server.to_string(),
            source,
        })?;
        Ok(self)
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_timing(mut self, request_timeout: Duration, backoff_step: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.backoff_step = backoff_step;
        self
    }
}

/// One outbound call: method, a path or link, query parameters and an optional XML body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub target: String,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn xml_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

/// Delay before a retry: `step * retries`, so 0, 1, 2, 3... steps.
pub fn backoff_delay(retries: u32, step: Duration) -> Duration {
    step.saturating_mul(retries)
}

/// The API answers 204 to a successful DELETE and 200 to everything else.
pub fn status_is_success(method: &Method, status: StatusCode) -> bool {
    if *method == Method::DELETE {
        status == StatusCode::NO_CONTENT
    } else {
        status == StatusCode::OK
    }
}

/// Remaining-call count from the response headers. Missing or malformed values are ignored.
pub fn parse_remaining(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(constants::REMAINING_CALLS_HEADER)?.to_str().ok()?;
    raw.trim().parse::<i64>().ok().map(|n| n.max(0) as u64)
}

/// HTTP client for the API with retry, timeout and call-budget tracking.
///
/// Cheap to clone; clones share the connection pool and the budget.
#[derive(Clone)]
pub struct AlmaClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    budget: Arc<CallBudget>,
    progress: Arc<dyn ProgressObserver>,
}

impl AlmaClient {
    pub fn new(config: ClientConfig, budget: Arc<CallBudget>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(constants::user_agent())
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            budget,
            progress: Arc::new(NoProgress),
        })
    }

    /// Report bulk-run progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> Arc<dyn ProgressObserver> {
        Arc::clone(&self.progress)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn budget(&self) -> &Arc<CallBudget> {
        &self.budget
    }

    /// Build the request URL. Links returned by the API are absolute, but the
    /// scheme, host and port are always replaced with the configured server's.
    pub fn resolve(&self, request: &ApiRequest) -> Result<Url> {
        let invalid = |source| ApiError::InvalidUrl {
            target: request.target.clone(),
            source,
        };
        let parsed = match Url::parse(&request.target) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.config.base_url.join(&request.target).map_err(invalid)?
            }
            Err(e) => return Err(invalid(e)),
        };

        let mut url = self.config.base_url.clone();
        url.set_path(parsed.path());
        url.set_query(parsed.query());
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request and return the response body.
    ///
    /// Connection failures are retried with linear backoff until the request
    /// timeout elapses. Cancellation of `cancel` wins over everything else and
    /// is never retried. The remaining-call header of every response is fed to
    /// the budget; a response that crosses the threshold is still returned.
    pub async fn send(&self, cancel: &CancellationToken, request: ApiRequest) -> Result<Vec<u8>> {
        let url = self.resolve(&request)?;
        let timeout = self.config.request_timeout;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(self.cancelled(&request.method, &url)),
            result = tokio::time::timeout(timeout, self.exchange(&request, &url)) => match result {
                Ok(result) => result,
                Err(_) => Err(ApiError::TimedOut {
                    method: request.method.clone(),
                    url: url.clone(),
                    after: timeout,
                }),
            },
        }
    }

    /// Send a request and decode the XML response.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        what: &'static str,
        request: ApiRequest,
    ) -> Result<T> {
        let body = self.send(cancel, request).await?;
        model::decode(what, &body)
    }

    /// Probe each endpoint's `/test` resource: GET for read access, POST for write access.
    pub async fn check_api_and_key(
        &self,
        cancel: &CancellationToken,
        read: &[&str],
        write: &[&str],
    ) -> Result<()> {
        for endpoint in read {
            self.send(cancel, ApiRequest::get(format!("{}/test", endpoint)))
                .await?;
            log::debug!("Read access to {} confirmed", endpoint);
        }
        for endpoint in write {
            self.send(cancel, ApiRequest::post(format!("{}/test", endpoint)))
                .await?;
            log::debug!("Write access to {} confirmed", endpoint);
        }
        Ok(())
    }

    fn cancelled(&self, method: &Method, url: &Url) -> ApiError {
        match self.budget.reason() {
            Some(CancelReason::ThresholdReached {
                remaining,
                threshold,
            }) => ApiError::ThresholdReached {
                remaining,
                threshold,
            },
            reason => ApiError::Cancelled {
                method: method.clone(),
                url: url.clone(),
                reason: reason.unwrap_or(CancelReason::Interrupted),
            },
        }
    }

    async fn exchange(&self, request: &ApiRequest, url: &Url) -> Result<Vec<u8>> {
        let step = self.config.backoff_step;
        let mut retries: u32 = 0;

        let response = loop {
            if retries > 0 {
                tokio::time::sleep(backoff_delay(retries, step)).await;
            }

            let mut builder = self
                .http
                .request(request.method.clone(), url.clone())
                .header(
                    AUTHORIZATION,
                    format!("{}{}", constants::AUTHORIZATION_PREFIX, self.config.key),
                );
            if let Some(body) = &request.body {
                builder = builder
                    .header(CONTENT_TYPE, "application/xml")
                    .body(body.clone());
            }

            match builder.send().await {
                Ok(response) => break response,
                Err(e) if e.is_builder() => return Err(ApiError::Client(e)),
                Err(e) => {
                    retries = retries.saturating_add(1);
                    log::warn!(
                        "Call to API failed, {}. Retrying in {:?}...",
                        e,
                        backoff_delay(retries, step)
                    );
                }
            }
        };

        let status = response.status();
        let remaining = parse_remaining(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Body {
                method: request.method.clone(),
                url: url.clone(),
                source,
            })?;

        if let Some(remaining) = remaining {
            self.budget.record(remaining);
        }

        if !status_is_success(&request.method, status) {
            return Err(ApiError::Status {
                method: request.method.clone(),
                url: url.clone(),
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        log::debug!("{} {} [{}]", request.method, url, status);
        Ok(body.to_vec())
    }
}
