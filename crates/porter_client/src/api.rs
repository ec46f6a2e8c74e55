use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use porter_core::{Job, JobId};
use porter_logging::porter_warn;

use crate::types::{ApiError, BatchId, JobSnapshot};

/// Transport settings for the job API.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub auth: Auth,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Attempts per request, counting the first.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_base_delay: Duration,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: Auth::None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(250),
        }
    }
}

/// Credential attached to every request.
#[derive(Debug, Clone)]
pub enum Auth {
    None,
    Bearer(String),
    /// Raw `Cookie` header value, for session-cookie deployments.
    Cookie(String),
}

#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn submit(&self, url: &str) -> Result<Job, ApiError>;
    /// Creates a server-side batch; its jobs are fetched separately via
    /// [`JobApi::get_batch`].
    async fn create_batch(&self, urls: &[String]) -> Result<BatchId, ApiError>;
    async fn get_batch(&self, id: &BatchId) -> Result<Vec<Job>, ApiError>;
    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError>;
    async fn get_job(&self, id: &JobId) -> Result<Job, ApiError>;
    async fn cancel_job(&self, id: &JobId) -> Result<Job, ApiError>;
    async fn retry_job(&self, id: &JobId) -> Result<Job, ApiError>;
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct BatchBody<'a> {
    urls: &'a [String],
}

#[derive(Deserialize)]
struct BatchCreated {
    id: String,
}

/// Job-list reply shape, shared by the list and batch endpoints.
#[derive(Deserialize)]
struct JobListBody {
    jobs: Vec<JobSnapshot>,
}

/// `JobApi` over HTTP.
///
/// Every request retries with exponential backoff on 5xx and transport
/// failures; 4xx and decode failures return immediately.
#[derive(Debug)]
pub struct HttpJobApi {
    client: reqwest::Client,
    settings: ApiSettings,
}

impl HttpJobApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        reqwest::Url::parse(&settings.base_url)
            .map_err(|_| ApiError::InvalidBaseUrl(settings.base_url.clone()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Cookie(cookie) => request.header(reqwest::header::COOKIE, cookie),
        }
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let attempts = self.settings.retry_attempts.max(1);
        let mut delay = self.settings.retry_base_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.authorize(build()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    ApiError::Status {
                        status,
                        body: snippet(&body),
                    }
                }
                Err(err) => map_reqwest_error(err),
            };
            if !error.is_retryable() || attempt >= attempts {
                return Err(error);
            }
            porter_warn!("job api attempt {attempt}/{attempts} failed ({error}), retrying in {delay:?}");
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }

    async fn fetch_job<F>(&self, build: F) -> Result<Job, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self.send_with_retry(build).await?;
        let snapshot: JobSnapshot = decode(response).await?;
        Ok(snapshot.into_job()?)
    }

    async fn fetch_jobs<F>(&self, build: F) -> Result<Vec<Job>, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let response = self.send_with_retry(build).await?;
        let body: JobListBody = decode(response).await?;
        body.jobs
            .into_iter()
            .map(|snapshot| Ok(snapshot.into_job()?))
            .collect()
    }
}

#[async_trait::async_trait]
impl JobApi for HttpJobApi {
    async fn submit(&self, url: &str) -> Result<Job, ApiError> {
        let endpoint = self.endpoint("api/jobs");
        self.fetch_job(|| self.client.post(&endpoint).json(&SubmitBody { url }))
            .await
    }

    async fn create_batch(&self, urls: &[String]) -> Result<BatchId, ApiError> {
        let endpoint = self.endpoint("api/batches");
        let response = self
            .send_with_retry(|| self.client.post(&endpoint).json(&BatchBody { urls }))
            .await?;
        let created: BatchCreated = decode(response).await?;
        Ok(BatchId::new(created.id))
    }

    async fn get_batch(&self, id: &BatchId) -> Result<Vec<Job>, ApiError> {
        let endpoint = self.endpoint(&format!("api/batches/{id}"));
        self.fetch_jobs(|| self.client.get(&endpoint)).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        let endpoint = self.endpoint("api/jobs");
        self.fetch_jobs(|| self.client.get(&endpoint)).await
    }

    async fn get_job(&self, id: &JobId) -> Result<Job, ApiError> {
        let endpoint = self.endpoint(&format!("api/jobs/{id}"));
        self.fetch_job(|| self.client.get(&endpoint)).await
    }

    async fn cancel_job(&self, id: &JobId) -> Result<Job, ApiError> {
        let endpoint = self.endpoint(&format!("api/jobs/{id}/cancel"));
        self.fetch_job(|| self.client.post(&endpoint)).await
    }

    async fn retry_job(&self, id: &JobId) -> Result<Job, ApiError> {
        let endpoint = self.endpoint(&format!("api/jobs/{id}/retry"));
        self.fetch_job(|| self.client.post(&endpoint)).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let body = response.text().await.map_err(map_reqwest_error)?;
    serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Network(err.to_string())
}

// Error bodies can be whole HTML pages; keep only a caption's worth.
fn snippet(body: &str) -> String {
    body.lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect()
}
