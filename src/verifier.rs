//! End-to-end artifact verification scenario
//!
//! Drives the platform through a full pipeline lifecycle and checks that
//! every artifact the run produced can actually be downloaded from inside
//! the cluster. Setup failures abort the scenario; per-artifact failures are
//! collected so one bad artifact never hides the state of the rest.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api_client::PlatformApiClient;
use crate::cluster::ClusterExec;
use crate::config::VerifierConfig;
use crate::download::{is_access_denied, normalize_download_url};
use crate::error::VerifyResult;
use crate::models::{ArtifactSummary, VerificationOutcome, VerificationReport};

/// Orchestrator for the artifact verification scenario
pub struct ArtifactVerifier {
    config: VerifierConfig,
    api: PlatformApiClient,
    cluster: Arc<dyn ClusterExec>,
}

impl ArtifactVerifier {
    /// Create a verifier from its collaborators
    pub fn new(
        config: VerifierConfig,
        api: PlatformApiClient,
        cluster: Arc<dyn ClusterExec>,
    ) -> Self {
        Self {
            config,
            api,
            cluster,
        }
    }

    /// Run the full scenario: upload, run, wait, then verify every artifact
    ///
    /// Returns the per-artifact report; use
    /// [`VerificationReport::ensure_passed`] to turn a failed report into an
    /// error. Upload, run creation, run completion, and artifact listing
    /// failures abort immediately.
    pub async fn run(&self) -> VerifyResult<VerificationReport> {
        let started_at = Utc::now();
        let name = &self.config.pipeline_name;

        self.api
            .upload_pipeline(name, &self.config.pipeline_file)
            .await?;
        let pipeline_id = self.api.resolve_pipeline_id(name).await?;
        let run = self.api.create_run(&pipeline_id, name).await?;
        self.api
            .wait_for_run_completion(
                &run.run_id,
                self.config.run_timeout,
                self.config.poll_interval,
            )
            .await?;

        // Resolved once; every download attempt reuses the same pod.
        let selector = self.config.pod_label_selector();
        let pod_name = self.cluster.locate_pod(&selector).await?;
        info!(pod = %pod_name, selector = %selector, "using pod for download checks");

        let artifacts = self.api.list_artifacts(&self.config.namespace).await?;
        if artifacts.is_empty() {
            warn!(run_id = %run.run_id, "run produced no artifacts");
        }

        let mut outcomes = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            outcomes.push(self.verify_artifact(artifact, &pod_name).await);
        }

        let report = VerificationReport {
            id: Uuid::new_v4(),
            pipeline_name: name.clone(),
            run_id: run.run_id,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            report_id = %report.id,
            total = report.outcomes.len(),
            failed = report.failures().len(),
            "verification finished"
        );
        Ok(report)
    }

    /// Check a single artifact's download from inside the cluster
    ///
    /// Every failure mode here is captured into the outcome rather than
    /// propagated, so the caller keeps iterating the remaining artifacts.
    async fn verify_artifact(
        &self,
        artifact: &ArtifactSummary,
        pod_name: &str,
    ) -> VerificationOutcome {
        let id = artifact.artifact_id.as_str();

        let detail_body = match self.api.get_artifact(id).await {
            Ok(body) => body,
            Err(e) => {
                error!(artifact_id = %id, error = %e, "artifact detail fetch failed");
                return VerificationOutcome::failure(id, e.to_string());
            }
        };
        debug!(artifact_id = %id, body = %detail_body, "artifact detail");

        let detail = match self.api.get_artifact_download_view(id).await {
            Ok(detail) => detail,
            Err(e) => {
                error!(artifact_id = %id, error = %e, "download view fetch failed");
                return VerificationOutcome::failure(id, e.to_string());
            }
        };

        let download_url = match normalize_download_url(&detail.download_url) {
            Ok(url) => url,
            Err(e) => {
                error!(artifact_id = %id, error = %e, "download URL unusable");
                return VerificationOutcome::failure(id, e.to_string());
            }
        };

        let command = format!("curl --insecure {}", download_url);
        let output = match self.cluster.exec(pod_name, &command).await {
            Ok(output) => output,
            Err(e) => {
                error!(artifact_id = %id, error = %e, "in-pod download failed");
                return VerificationOutcome::failure(id, e.to_string());
            }
        };

        if is_access_denied(&output) {
            error!(artifact_id = %id, output = %output, "artifact download denied");
            return VerificationOutcome::failure(id, output);
        }

        debug!(artifact_id = %id, "artifact download verified");
        VerificationOutcome::success(id)
    }
}
