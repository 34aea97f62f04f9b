//! Scenario configuration
//!
//! All cluster and platform coordinates are passed in explicitly so the
//! verifier stays composable; nothing reads ambient globals after startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{VerifyError, VerifyResult};

/// Configuration for one verification scenario
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Base URL of the platform API server
    pub api_server_url: String,
    /// Namespace the platform (and its artifacts) live in
    pub namespace: String,
    /// Display name the pipeline is uploaded under
    pub pipeline_name: String,
    /// Compiled pipeline definition to upload
    pub pipeline_file: PathBuf,
    /// Component half of the pod label selector (`app=<component>-<namespace>`)
    pub component: String,
    /// How long to wait for the run to reach a terminal state
    pub run_timeout: Duration,
    /// Delay between run-status polls
    pub poll_interval: Duration,
    /// Upper bound on a single in-pod exec call
    pub exec_timeout: Duration,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl VerifierConfig {
    /// Load the configuration from the environment
    pub fn from_env() -> VerifyResult<Self> {
        Ok(Self {
            api_server_url: required("API_SERVER_URL")?,
            namespace: required("PIPELINE_NAMESPACE")?,
            pipeline_name: required("PIPELINE_NAME")?,
            pipeline_file: PathBuf::from(required("PIPELINE_FILE")?),
            component: std::env::var("PIPELINE_COMPONENT")
                .unwrap_or_else(|_| "ds-pipeline".to_owned()),
            run_timeout: duration_var("RUN_TIMEOUT_SECONDS", 600)?,
            poll_interval: duration_var("POLL_INTERVAL_SECONDS", 5)?,
            exec_timeout: duration_var("EXEC_TIMEOUT_SECONDS", 60)?,
            http_timeout: duration_var("HTTP_TIMEOUT_SECONDS", 30)?,
        })
    }

    /// Label selector used to locate the platform's API pod
    pub fn pod_label_selector(&self) -> String {
        crate::cluster::pod_label_selector(&self.component, &self.namespace)
    }
}

fn required(name: &str) -> VerifyResult<String> {
    let value = std::env::var(name)
        .map_err(|_| VerifyError::configuration(format!("{} must be set", name)))?;
    if value.is_empty() {
        return Err(VerifyError::configuration(format!(
            "{} must not be empty",
            name
        )));
    }
    Ok(value)
}

fn duration_var(name: &str, default_secs: u64) -> VerifyResult<Duration> {
    let secs = match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| VerifyError::configuration(format!("{} must be a number", name)))?,
        Err(_) => default_secs,
    };
    Ok(Duration::from_secs(secs))
}
