//! Data models for the platform API and verification results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One artifact as returned by the artifact-listing endpoint
///
/// The `download_url` at this stage is a relative placeholder; the
/// authoritative URL comes from the download view of the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSummary {
    /// Artifact ID assigned by the platform
    pub artifact_id: String,
    /// Download URL as listed (relative/placeholder)
    #[serde(default)]
    pub download_url: String,
}

/// Body of the artifact-listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactListResponse {
    /// Artifacts produced by runs in the queried namespace
    #[serde(default)]
    pub artifacts: Vec<ArtifactSummary>,
}

/// Body of the artifact-detail endpoint (download view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDetail {
    /// Artifact ID assigned by the platform
    pub artifact_id: String,
    /// Resolved, absolute download URL
    #[serde(default)]
    pub download_url: String,
}

/// One pipeline as returned by the pipeline-listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Pipeline ID assigned by the platform
    pub pipeline_id: String,
    /// Display name the pipeline was uploaded under
    #[serde(default)]
    pub display_name: String,
}

/// Body of the pipeline-listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineListResponse {
    #[serde(default)]
    pub pipelines: Vec<PipelineSummary>,
}

/// Body returned by run creation and run-status polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// Run ID assigned by the platform
    pub run_id: String,
    /// Current run state (e.g. PENDING, RUNNING, SUCCEEDED, FAILED)
    #[serde(default)]
    pub state: Option<String>,
}

/// Result of verifying a single artifact's download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Artifact this outcome belongs to
    pub artifact_id: String,
    /// Whether the in-cluster download succeeded
    pub succeeded: bool,
    /// Raw output or error text for failed downloads
    pub message: Option<String>,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
}

impl VerificationOutcome {
    /// Create a succeeding outcome
    pub fn success<S: Into<String>>(artifact_id: S) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            succeeded: true,
            message: None,
            checked_at: Utc::now(),
        }
    }

    /// Create a failing outcome carrying the diagnostic text
    pub fn failure<S: Into<String>, M: Into<String>>(artifact_id: S, message: M) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            succeeded: false,
            message: Some(message.into()),
            checked_at: Utc::now(),
        }
    }
}

/// Aggregate result of one verification scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Unique identifier for this scenario run
    pub id: Uuid,
    /// Pipeline the scenario exercised
    pub pipeline_name: String,
    /// Run the artifacts came from
    pub run_id: String,
    /// Per-artifact outcomes, in listing order
    pub outcomes: Vec<VerificationOutcome>,
    /// When the scenario started
    pub started_at: DateTime<Utc>,
    /// When the scenario finished
    pub finished_at: DateTime<Utc>,
}

impl VerificationReport {
    /// True iff every outcome succeeded; an empty set passes vacuously
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    /// Outcomes that failed, in listing order
    pub fn failures(&self) -> Vec<&VerificationOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded).collect()
    }

    /// Convert a failed report into the aggregate error, enumerating the
    /// failing artifact IDs
    pub fn ensure_passed(&self) -> crate::error::VerifyResult<()> {
        if self.passed() {
            return Ok(());
        }
        Err(crate::error::VerifyError::ArtifactDownloads {
            failed_ids: self
                .failures()
                .iter()
                .map(|o| o.artifact_id.clone())
                .collect(),
            total: self.outcomes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(outcomes: Vec<VerificationOutcome>) -> VerificationReport {
        VerificationReport {
            id: Uuid::new_v4(),
            pipeline_name: "p".to_string(),
            run_id: "r".to_string(),
            outcomes,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_report_passes_vacuously() {
        let report = make_report(Vec::new());
        assert!(report.passed());
        assert!(report.ensure_passed().is_ok());
    }

    #[test]
    fn test_single_failure_fails_report() {
        let report = make_report(vec![
            VerificationOutcome::success("a1"),
            VerificationOutcome::failure("a2", "Access Denied"),
            VerificationOutcome::success("a3"),
        ]);
        assert!(!report.passed());
        let err = report.ensure_passed().unwrap_err();
        assert!(err.to_string().contains("a2"));
        assert!(err.to_string().contains("1 of 3"));
    }

    #[test]
    fn test_artifact_list_decodes_platform_shape() {
        let body = r#"{"artifacts":[{"artifact_id":"a1","download_url":"placeholder"}]}"#;
        let parsed: ArtifactListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.artifacts.len(), 1);
        assert_eq!(parsed.artifacts[0].artifact_id, "a1");
        assert_eq!(parsed.artifacts[0].download_url, "placeholder");
    }

    #[test]
    fn test_artifact_list_tolerates_missing_field() {
        let parsed: ArtifactListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.artifacts.is_empty());
    }
}
