//! HTTP client for the pipeline platform API

use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{VerifyError, VerifyResult};
use crate::models::{
    ArtifactDetail, ArtifactListResponse, ArtifactSummary, PipelineListResponse, PipelineSummary,
    RunResponse,
};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    std::cmp::min(
        Duration::from_millis((current.as_millis() as f64 * config.backoff_multiplier) as u64),
        config.max_delay,
    )
}

/// Client for the platform's pipeline, run, and artifact endpoints
#[derive(Debug, Clone)]
pub struct PlatformApiClient {
    /// Base URL of the platform API server
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
}

impl PlatformApiClient {
    /// Create a new API client
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> VerifyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(VerifyError::from)?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            retry_config: RetryConfig::default(),
        })
    }

    /// Override the retry configuration
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Upload a compiled pipeline definition under a display name
    ///
    /// Multipart upload, form field `uploadfile`, display name passed as a
    /// URL-encoded query parameter.
    pub async fn upload_pipeline(&self, name: &str, file: &Path) -> VerifyResult<()> {
        info!(pipeline = %name, file = %file.display(), "uploading pipeline definition");

        let contents = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("pipeline.yaml")
            .to_string();
        let url = format!(
            "{}/apis/v2beta1/pipelines/upload?name={}",
            self.base_url,
            urlencoding::encode(name)
        );

        let response = self
            .execute_with_retry("pipeline upload", || {
                let part = multipart::Part::bytes(contents.clone()).file_name(file_name.clone());
                let form = multipart::Form::new().part("uploadfile", part);
                self.client.post(&url).multipart(form).send()
            })
            .await?;
        self.require_ok("pipeline upload", response).await?;

        info!(pipeline = %name, "pipeline uploaded");
        Ok(())
    }

    /// Look up the ID of an uploaded pipeline by display name
    ///
    /// The listing can lag the upload, so the lookup is retried within the
    /// client's retry policy before giving up with `PipelineNotFound`.
    pub async fn resolve_pipeline_id(&self, name: &str) -> VerifyResult<String> {
        let mut delay = self.retry_config.initial_delay;

        for attempt in 1..=self.retry_config.max_attempts {
            let pipelines = self.list_pipelines().await?;
            if let Some(found) = pipelines.into_iter().find(|p| p.display_name == name) {
                debug!(pipeline = %name, id = %found.pipeline_id, "resolved pipeline id");
                return Ok(found.pipeline_id);
            }

            if attempt < self.retry_config.max_attempts {
                debug!(
                    pipeline = %name,
                    attempt,
                    "pipeline not listed yet, retrying in {}ms",
                    delay.as_millis()
                );
                sleep(delay).await;
                delay = next_delay(delay, &self.retry_config);
            }
        }

        Err(VerifyError::PipelineNotFound {
            name: name.to_string(),
        })
    }

    /// List uploaded pipelines
    pub async fn list_pipelines(&self) -> VerifyResult<Vec<PipelineSummary>> {
        let url = format!("{}/apis/v2beta1/pipelines", self.base_url);
        let response = self
            .execute_with_retry("pipeline listing", || self.client.get(&url).send())
            .await?;
        let body = self.require_ok("pipeline listing", response).await?;
        let parsed: PipelineListResponse = decode("pipeline listing", &body)?;
        Ok(parsed.pipelines)
    }

    /// Start a run of the referenced pipeline
    pub async fn create_run(
        &self,
        pipeline_id: &str,
        display_name: &str,
    ) -> VerifyResult<RunResponse> {
        info!(pipeline_id = %pipeline_id, run = %display_name, "creating run");

        let url = format!("{}/apis/v2beta1/runs", self.base_url);
        let payload = json!({
            "display_name": display_name,
            "pipeline_version_reference": {
                "pipeline_id": pipeline_id,
            },
        });

        let response = self
            .execute_with_retry("run creation", || {
                self.client.post(&url).json(&payload).send()
            })
            .await?;
        let body = self.require_ok("run creation", response).await?;
        let run: RunResponse = decode("run creation", &body)?;

        info!(run_id = %run.run_id, "run created");
        Ok(run)
    }

    /// Fetch the current state of a run
    pub async fn get_run(&self, run_id: &str) -> VerifyResult<RunResponse> {
        let url = format!("{}/apis/v2beta1/runs/{}", self.base_url, run_id);
        let response = self
            .execute_with_retry("run status", || self.client.get(&url).send())
            .await?;
        let body = self.require_ok("run status", response).await?;
        decode("run status", &body)
    }

    /// Poll a run until it reaches a terminal state or the timeout elapses
    pub async fn wait_for_run_completion(
        &self,
        run_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> VerifyResult<RunResponse> {
        info!(
            run_id = %run_id,
            timeout_secs = timeout.as_secs(),
            "waiting for run completion"
        );

        let start = Instant::now();
        loop {
            if start.elapsed() > timeout {
                return Err(VerifyError::RunTimeout {
                    run_id: run_id.to_string(),
                    seconds: timeout.as_secs(),
                });
            }

            let run = self.get_run(run_id).await?;
            let state = run.state.clone().unwrap_or_default().to_uppercase();
            match state.as_str() {
                "SUCCEEDED" => {
                    info!(run_id = %run_id, "run completed");
                    return Ok(run);
                }
                "FAILED" | "CANCELED" | "CANCELLED" | "ERROR" => {
                    return Err(VerifyError::RunFailed {
                        run_id: run_id.to_string(),
                        state,
                    });
                }
                "" | "PENDING" | "RUNNING" | "CANCELING" | "PAUSED" => {
                    debug!(run_id = %run_id, state = %state, "run still in progress");
                    sleep(poll_interval).await;
                }
                other => {
                    warn!(run_id = %run_id, state = %other, "unknown run state");
                    sleep(poll_interval).await;
                }
            }
        }
    }

    /// List the artifacts produced by runs in a namespace
    pub async fn list_artifacts(&self, namespace: &str) -> VerifyResult<Vec<ArtifactSummary>> {
        let url = format!(
            "{}/apis/v2beta1/artifacts?namespace={}",
            self.base_url,
            urlencoding::encode(namespace)
        );
        let response = self
            .execute_with_retry("artifact listing", || self.client.get(&url).send())
            .await?;
        let body = self.require_ok("artifact listing", response).await?;
        let parsed: ArtifactListResponse = decode("artifact listing", &body)?;

        debug!(namespace = %namespace, count = parsed.artifacts.len(), "listed artifacts");
        Ok(parsed.artifacts)
    }

    /// Fetch an artifact's detail record
    ///
    /// Returns the raw body; the download view is the authoritative source
    /// for the download URL, so this body is only kept for diagnostics.
    pub async fn get_artifact(&self, artifact_id: &str) -> VerifyResult<String> {
        let url = format!("{}/apis/v2beta1/artifacts/{}", self.base_url, artifact_id);
        let response = self
            .execute_with_retry("artifact detail", || self.client.get(&url).send())
            .await?;
        self.require_ok("artifact detail", response).await
    }

    /// Fetch an artifact's detail record with the download view flag,
    /// yielding the resolved download URL
    pub async fn get_artifact_download_view(
        &self,
        artifact_id: &str,
    ) -> VerifyResult<ArtifactDetail> {
        let url = format!(
            "{}/apis/v2beta1/artifacts/{}?view=DOWNLOAD",
            self.base_url, artifact_id
        );
        let response = self
            .execute_with_retry("artifact download view", || self.client.get(&url).send())
            .await?;
        let body = self.require_ok("artifact download view", response).await?;
        debug!(artifact_id = %artifact_id, body = %body, "artifact download view");
        decode("artifact download view", &body)
    }

    /// Execute an HTTP request, retrying transport errors and server errors
    ///
    /// Client errors (4xx) are returned as-is; the caller decides whether the
    /// status is acceptable.
    async fn execute_with_retry<F, Fut>(
        &self,
        operation: &'static str,
        request_fn: F,
    ) -> VerifyResult<Response>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match request_fn().await {
                Ok(response) => {
                    if response.status().is_success() || response.status().is_client_error() {
                        return Ok(response);
                    }
                    if attempt >= self.retry_config.max_attempts {
                        let status = response.status().as_u16();
                        let body = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "<unreadable body>".to_string());
                        return Err(VerifyError::unexpected_status(operation, status, body));
                    }
                    warn!(
                        operation,
                        status = response.status().as_u16(),
                        attempt,
                        max_attempts = self.retry_config.max_attempts,
                        "server error, retrying in {}ms",
                        delay.as_millis()
                    );
                }
                Err(e) => {
                    if attempt >= self.retry_config.max_attempts {
                        return Err(VerifyError::Transport(e));
                    }
                    warn!(
                        operation,
                        error = %e,
                        attempt,
                        max_attempts = self.retry_config.max_attempts,
                        "request failed, retrying in {}ms",
                        delay.as_millis()
                    );
                }
            }

            sleep(delay).await;
            delay = next_delay(delay, &self.retry_config);
        }
    }

    /// Require an exact 200 response and return its body
    async fn require_ok(&self, operation: &'static str, response: Response) -> VerifyResult<String> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        if status != 200 {
            return Err(VerifyError::unexpected_status(operation, status, body));
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(context: &'static str, body: &str) -> VerifyResult<T> {
    serde_json::from_str(body).map_err(|e| VerifyError::malformed_response(context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = PlatformApiClient::new("http://localhost:8888", Duration::from_secs(30));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "http://localhost:8888");
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.backoff_multiplier, 2.0);
    }

    #[test]
    fn test_next_delay_backs_off_and_caps() {
        let config = RetryConfig::default();
        let second = next_delay(config.initial_delay, &config);
        assert_eq!(second, Duration::from_secs(2));
        let capped = next_delay(Duration::from_secs(25), &config);
        assert_eq!(capped, Duration::from_secs(30));
    }

    #[test]
    fn test_decode_malformed_body() {
        let result: VerifyResult<ArtifactListResponse> = decode("artifact listing", "not json");
        assert!(matches!(
            result,
            Err(VerifyError::MalformedResponse { context: "artifact listing", .. })
        ));
    }
}
