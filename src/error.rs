//! Error types for the artifact verification suite

use thiserror::Error;

/// Main error type for verification operations
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {context} response: {source}")]
    MalformedResponse {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("download URL is not a valid URL: {0}")]
    MalformedUrl(#[from] url::ParseError),

    #[error("failed to list pods: {message}")]
    PodList { message: String },

    #[error("no pods found with the label {selector}")]
    PodNotFound { selector: String },

    #[error("failed to open exec session in pod {pod}: {message}")]
    ExecSetup { pod: String, message: String },

    #[error("exec stream failed in pod {pod}: {message}")]
    ExecStream { pod: String, message: String },

    #[error("exec in pod {pod} did not finish within {seconds}s")]
    ExecTimeout { pod: String, seconds: u64 },

    #[error("no pipeline named {name:?} found on the platform")]
    PipelineNotFound { name: String },

    #[error("run {run_id} finished in state {state}")]
    RunFailed { run_id: String, state: String },

    #[error("timed out after {seconds}s waiting for run {run_id} to complete")]
    RunTimeout { run_id: String, seconds: u64 },

    #[error("{} of {total} artifacts failed download verification: {}", .failed_ids.len(), .failed_ids.join(", "))]
    ArtifactDownloads {
        failed_ids: Vec<String>,
        total: usize,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for verification operations
pub type VerifyResult<T> = Result<T, VerifyError>;

impl VerifyError {
    /// Create a new unexpected-status error
    pub fn unexpected_status<S: Into<String>>(
        operation: &'static str,
        status: u16,
        body: S,
    ) -> Self {
        Self::UnexpectedStatus {
            operation,
            status,
            body: body.into(),
        }
    }

    /// Create a new malformed-response error
    pub fn malformed_response(context: &'static str, source: serde_json::Error) -> Self {
        Self::MalformedResponse { context, source }
    }

    /// Create a new pod listing error
    pub fn pod_list<S: Into<String>>(message: S) -> Self {
        Self::PodList {
            message: message.into(),
        }
    }

    /// Create a new exec setup error
    pub fn exec_setup<S: Into<String>>(pod: S, message: String) -> Self {
        Self::ExecSetup {
            pod: pod.into(),
            message,
        }
    }

    /// Create a new exec stream error
    pub fn exec_stream<S: Into<String>>(pod: S, message: String) -> Self {
        Self::ExecStream {
            pod: pod.into(),
            message,
        }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
