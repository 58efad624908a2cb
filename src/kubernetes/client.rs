//! Kubernetes API client
//!
//! Wraps the kube crate: builds a client from a session's ephemeral access
//! profile and looks up the task pod before an exec is attempted.

use kube::{
    api::Api,
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use k8s_openapi::api::core::v1::Pod;

use super::config::ProfileFile;
use crate::error::{TunnelError, TunnelResult};
use crate::session::PodLocator;

/// A Kubernetes pod
#[derive(Debug, Clone)]
pub struct KubePod {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub containers: Vec<String>,
}

impl KubePod {
    /// Whether the pod can accept an exec
    pub fn is_running(&self) -> bool {
        self.status == "Running"
    }
}

/// Kubernetes API client scoped to one session
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Create a client from the profile written for this session.
    ///
    /// Not cached: every session authenticates with its own credentials.
    pub async fn from_profile(profile: &ProfileFile) -> TunnelResult<Self> {
        let start = std::time::Instant::now();
        let context_name = profile.context_name();

        let kubeconfig = Kubeconfig::read_from(profile.path())
            .map_err(|e| TunnelError::Connect(format!("Failed to load profile: {}", e)))?;
        let options = KubeConfigOptions {
            context: Some(context_name.to_string()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| TunnelError::Connect(format!("Invalid access profile: {}", e)))?;
        tracing::debug!("Config loaded in {:?}", start.elapsed());

        let client = Client::try_from(config)
            .map_err(|e| TunnelError::Connect(format!("Failed to create client: {}", e)))?;
        tracing::info!("K8s client for {} created in {:?}", context_name, start.elapsed());

        Ok(Self { client })
    }

    /// Get the raw kube client for exec operations
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get a specific pod
    pub async fn get_pod(&self, namespace: &str, name: &str) -> Result<KubePod, kube::Error> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods.get(name).await?;
        Ok(Self::convert_pod(pod))
    }

    /// Fail with a connect error unless the located pod exists and is running
    pub async fn ensure_running(&self, locator: &PodLocator) -> TunnelResult<KubePod> {
        let pod = self
            .get_pod(&locator.namespace, &locator.pod)
            .await
            .map_err(|e| {
                TunnelError::Connect(format!("Pod {} not found: {}", locator, e))
            })?;

        if !pod.is_running() {
            return Err(TunnelError::Connect(format!(
                "Pod {} is not running (phase: {})",
                locator, pod.status
            )));
        }

        if let Some(ref container) = locator.container {
            if !pod.containers.is_empty() && !pod.containers.contains(container) {
                return Err(TunnelError::Connect(format!(
                    "Container {} not found in pod {}",
                    container, locator.pod
                )));
            }
        }

        Ok(pod)
    }

    /// Convert a k8s Pod to our KubePod type
    fn convert_pod(pod: Pod) -> KubePod {
        let name = pod.metadata.name.unwrap_or_default();
        let namespace = pod.metadata.namespace.unwrap_or_default();

        let (status, containers) = match pod.status {
            Some(status) => {
                let phase = status.phase.unwrap_or_else(|| "Unknown".to_string());
                let containers = status
                    .container_statuses
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| c.name)
                    .collect();
                (phase, containers)
            }
            None => ("Unknown".to_string(), vec![]),
        };

        KubePod {
            name,
            namespace,
            status,
            containers,
        }
    }
}
