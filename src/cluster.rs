//! Cluster-side access: pod discovery and remote command execution
//!
//! The platform's API pod is located once per scenario via a label selector
//! and reused for every in-pod download attempt. Exec goes through the pod
//! exec subresource over the Kubernetes API, not kubectl.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, AttachParams, ListParams},
    Client,
};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{VerifyError, VerifyResult};

/// Label selector for the platform's API pod: `app=<component>-<namespace>`
pub fn pod_label_selector(component: &str, namespace: &str) -> String {
    format!("app={}-{}", component, namespace)
}

/// Cluster operations the verifier depends on
#[async_trait]
pub trait ClusterExec: Send + Sync {
    /// Resolve a running pod's name from a label selector
    ///
    /// Picks the first named pod in listing order; the order itself is
    /// unspecified but stable within one invocation.
    async fn locate_pod(&self, label_selector: &str) -> VerifyResult<String>;

    /// Run a shell command inside the named pod and return its output
    async fn exec(&self, pod_name: &str, command: &str) -> VerifyResult<String>;
}

/// Kubernetes-backed [`ClusterExec`] scoped to one namespace
#[derive(Clone)]
pub struct PodClient {
    pods: Api<Pod>,
    exec_timeout: Duration,
}

impl PodClient {
    /// Create a client scoped to `namespace` using an externally supplied
    /// cluster client configuration
    pub fn new(client: Client, namespace: &str, exec_timeout: Duration) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
            exec_timeout,
        }
    }
}

fn first_pod_name(items: Vec<Pod>) -> Option<String> {
    items
        .into_iter()
        .find_map(|pod| pod.metadata.name)
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl ClusterExec for PodClient {
    async fn locate_pod(&self, label_selector: &str) -> VerifyResult<String> {
        let list = self
            .pods
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| VerifyError::pod_list(e.to_string()))?;

        first_pod_name(list.items).ok_or_else(|| VerifyError::PodNotFound {
            selector: label_selector.to_string(),
        })
    }

    async fn exec(&self, pod_name: &str, command: &str) -> VerifyResult<String> {
        let cmd = vec!["sh".to_string(), "-c".to_string(), command.to_string()];
        // With a TTY allocated the server merges stderr into the terminal
        // stream, so only stdout is requested and read back.
        let params = AttachParams::default()
            .stdin(false)
            .stdout(true)
            .stderr(false)
            .tty(true);

        debug!(pod = %pod_name, command = %command, "executing command in pod");

        let session = async {
            let mut attached = self
                .pods
                .exec(pod_name, cmd, &params)
                .await
                .map_err(|e| VerifyError::exec_setup(pod_name, e.to_string()))?;

            let mut stdout = attached.stdout().ok_or_else(|| {
                VerifyError::exec_stream(pod_name, "exec session has no stdout stream".to_string())
            })?;
            let mut output = Vec::new();
            stdout
                .read_to_end(&mut output)
                .await
                .map_err(|e| VerifyError::exec_stream(pod_name, e.to_string()))?;

            attached
                .join()
                .await
                .map_err(|e| VerifyError::exec_stream(pod_name, e.to_string()))?;

            Ok::<String, VerifyError>(String::from_utf8_lossy(&output).to_string())
        };

        let output = tokio::time::timeout(self.exec_timeout, session)
            .await
            .map_err(|_| VerifyError::ExecTimeout {
                pod: pod_name.to_string(),
                seconds: self.exec_timeout.as_secs(),
            })??;

        debug!(pod = %pod_name, output_len = output.len(), "exec completed");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: name.map(str::to_string),
                ..ObjectMeta::default()
            },
            ..Pod::default()
        }
    }

    #[test]
    fn test_selector_shape() {
        assert_eq!(pod_label_selector("ds-pipeline", "dspa"), "app=ds-pipeline-dspa");
    }

    #[test]
    fn test_first_pod_name_picks_listing_order() {
        let items = vec![pod(Some("api-server-0")), pod(Some("api-server-1"))];
        assert_eq!(first_pod_name(items).as_deref(), Some("api-server-0"));
    }

    #[test]
    fn test_first_pod_name_skips_unnamed() {
        let items = vec![pod(None), pod(Some("api-server-1"))];
        assert_eq!(first_pod_name(items).as_deref(), Some("api-server-1"));
    }

    #[test]
    fn test_first_pod_name_empty_list() {
        assert_eq!(first_pod_name(Vec::new()), None);
    }
}
