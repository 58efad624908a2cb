//! Ephemeral cluster access profile
//!
//! Renders a session's credentials into a single-context kubeconfig whose
//! user authenticates through `aws eks get-token`, and writes it to a
//! uniquely named temporary file that is removed when the guard drops.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::ClusterSettings;
use crate::session::Credential;

/// Client authentication API used by the exec plugin
pub const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to write profile: {0}")]
    WriteError(#[from] std::io::Error),
    #[error("Failed to render profile: {0}")]
    RenderError(#[from] serde_yaml_ng::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
    #[serde(rename = "certificate-authority-data")]
    pub certificate_authority_data: String,
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: UserEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub exec: ExecEntry,
}

/// External token command and its injected environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecEntry {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Rendered access configuration for one session.
///
/// Cluster, context and user entries all share one name, the EKS cluster
/// ARN, so `context_name` is also the cluster name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunnelProfile {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    #[serde(rename = "current-context")]
    pub current_context: String,
    pub clusters: Vec<NamedCluster>,
    pub contexts: Vec<NamedContext>,
    pub users: Vec<NamedUser>,
    #[serde(default)]
    pub preferences: serde_json::Map<String, serde_json::Value>,
}

impl TunnelProfile {
    /// Deterministically render a profile from a credential
    pub fn build(credential: &Credential, cluster: &ClusterSettings) -> Self {
        let name = cluster_arn(&cluster.region, &credential.account_id, &cluster.cluster_name);

        let exec = ExecEntry {
            api_version: EXEC_API_VERSION.to_string(),
            command: "aws".to_string(),
            args: vec![
                "--region".to_string(),
                cluster.region.clone(),
                "eks".to_string(),
                "get-token".to_string(),
                "--cluster-name".to_string(),
                cluster.cluster_name.clone(),
            ],
            env: vec![
                EnvVar {
                    name: "AWS_ACCESS_KEY_ID".to_string(),
                    value: credential.access_key.clone(),
                },
                EnvVar {
                    name: "AWS_SECRET_ACCESS_KEY".to_string(),
                    value: credential.secret_key.clone(),
                },
                EnvVar {
                    name: "AWS_SESSION_TOKEN".to_string(),
                    value: credential.session_token.clone(),
                },
            ],
        };

        Self {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            current_context: name.clone(),
            clusters: vec![NamedCluster {
                name: name.clone(),
                cluster: ClusterEntry {
                    certificate_authority_data: credential.cert_auth_data.clone(),
                    server: credential.cluster_endpoint.clone(),
                },
            }],
            contexts: vec![NamedContext {
                name: name.clone(),
                context: ContextEntry {
                    cluster: name.clone(),
                    user: name.clone(),
                },
            }],
            users: vec![NamedUser {
                name,
                user: UserEntry { exec },
            }],
            preferences: serde_json::Map::new(),
        }
    }

    /// Name of the single context in this profile
    pub fn context_name(&self) -> &str {
        &self.current_context
    }

    /// Render as kubeconfig YAML
    pub fn to_yaml(&self) -> Result<String, ProfileError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Write the profile to a fresh temporary file.
    ///
    /// The file is created with owner-only permissions and deleted when the
    /// returned guard is dropped.
    pub fn write_ephemeral(&self) -> Result<ProfileFile, ProfileError> {
        let yaml = self.to_yaml()?;
        let mut file = tempfile::Builder::new()
            .prefix("taskshell-kubeconfig-")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(yaml.as_bytes())?;
        file.flush()?;

        tracing::debug!("Wrote access profile to {:?}", file.path());
        Ok(ProfileFile {
            file,
            context: self.current_context.clone(),
        })
    }
}

/// EKS cluster ARN used as the cluster, context and user name
pub fn cluster_arn(region: &str, account_id: &str, cluster_name: &str) -> String {
    format!("arn:aws:eks:{}:{}:cluster/{}", region, account_id, cluster_name)
}

/// Scoped handle on the on-disk profile
pub struct ProfileFile {
    file: NamedTempFile,
    context: String,
}

impl ProfileFile {
    /// Path the orchestration client should read
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Context to select from the file
    pub fn context_name(&self) -> &str {
        &self.context
    }
}

impl Drop for ProfileFile {
    fn drop(&mut self) {
        tracing::debug!("Removing access profile {:?}", self.file.path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential {
            access_key: "ASIAEXAMPLE".to_string(),
            secret_key: "it's: a \"secret\" #1".to_string(),
            session_token: "FwoGZXIvYXdzE/+==\nline".to_string(),
            cert_auth_data: "LS0tLS1CRUdJTg==".to_string(),
            cluster_endpoint: "https://ABC.gr7.us-west-2.eks.amazonaws.com".to_string(),
            account_id: "812206152185".to_string(),
            namespace: "task-ns".to_string(),
        }
    }

    #[test]
    fn test_names_are_identical() {
        let profile = TunnelProfile::build(&credential(), &ClusterSettings::default());
        let expected = "arn:aws:eks:us-west-2:812206152185:cluster/prion-prod";

        assert_eq!(profile.context_name(), expected);
        assert_eq!(profile.clusters[0].name, expected);
        assert_eq!(profile.contexts[0].name, expected);
        assert_eq!(profile.contexts[0].context.cluster, expected);
        assert_eq!(profile.contexts[0].context.user, expected);
        assert_eq!(profile.users[0].name, expected);
    }

    #[test]
    fn test_credentials_survive_yaml_roundtrip() {
        let cred = credential();
        let profile = TunnelProfile::build(&cred, &ClusterSettings::default());
        let yaml = profile.to_yaml().unwrap();
        let parsed: TunnelProfile = serde_yaml_ng::from_str(&yaml).unwrap();

        assert_eq!(parsed, profile);
        let env = &parsed.users[0].user.exec.env;
        assert_eq!(env[0].value, cred.access_key);
        assert_eq!(env[1].value, cred.secret_key);
        assert_eq!(env[2].value, cred.session_token);
        assert_eq!(parsed.clusters[0].cluster.server, cred.cluster_endpoint);
        assert_eq!(
            parsed.clusters[0].cluster.certificate_authority_data,
            cred.cert_auth_data
        );
    }

    #[test]
    fn test_exec_invocation() {
        let cluster = ClusterSettings {
            region: "eu-central-1".to_string(),
            cluster_name: "tasks".to_string(),
        };
        let profile = TunnelProfile::build(&credential(), &cluster);
        let exec = &profile.users[0].user.exec;

        assert_eq!(exec.api_version, EXEC_API_VERSION);
        assert_eq!(exec.command, "aws");
        assert_eq!(
            exec.args,
            vec!["--region", "eu-central-1", "eks", "get-token", "--cluster-name", "tasks"]
        );
        assert_eq!(
            profile.context_name(),
            "arn:aws:eks:eu-central-1:812206152185:cluster/tasks"
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = TunnelProfile::build(&credential(), &ClusterSettings::default());
        let b = TunnelProfile::build(&credential(), &ClusterSettings::default());
        assert_eq!(a.to_yaml().unwrap(), b.to_yaml().unwrap());
    }

    #[test]
    fn test_kube_accepts_profile() {
        let profile = TunnelProfile::build(&credential(), &ClusterSettings::default());
        let kubeconfig = kube::config::Kubeconfig::from_yaml(&profile.to_yaml().unwrap()).unwrap();

        assert_eq!(kubeconfig.current_context.as_deref(), Some(profile.context_name()));
        assert_eq!(kubeconfig.clusters.len(), 1);
        assert_eq!(kubeconfig.auth_infos.len(), 1);
    }

    #[test]
    fn test_ephemeral_file_is_removed_on_drop() {
        let profile = TunnelProfile::build(&credential(), &ClusterSettings::default());
        let file = profile.write_ephemeral().unwrap();
        let path = file.path().to_path_buf();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("get-token"));
        assert_eq!(file.context_name(), profile.context_name());

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_ephemeral_files_are_unique() {
        let profile = TunnelProfile::build(&credential(), &ClusterSettings::default());
        let a = profile.write_ephemeral().unwrap();
        let b = profile.write_ephemeral().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
