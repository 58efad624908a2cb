use std::fmt;

use serde_json::Value;

use crate::error::{TunnelError, TunnelResult};

/// Fields the broker must return, in the order they are reported when missing
pub const REQUIRED_FIELDS: [&str; 7] = [
    "tmp_access_key",
    "tmp_secret_key",
    "tmp_session_token",
    "cert_auth_data",
    "cluster_endpoint",
    "namespace",
    "aws_account_id",
];

/// Short-lived cluster access credentials for one session
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: String,
    /// Base64 certificate-authority bundle of the cluster
    pub cert_auth_data: String,
    pub cluster_endpoint: String,
    pub account_id: String,
    pub namespace: String,
}

// Keeps secrets out of logs and panic messages
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("cluster_endpoint", &self.cluster_endpoint)
            .field("account_id", &self.account_id)
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl Credential {
    /// Extract a credential from a broker response body.
    ///
    /// Every required field is checked; if any is absent (or not a scalar)
    /// the whole response is rejected and all missing names are reported.
    pub fn from_response(body: &Value) -> TunnelResult<Self> {
        let mut missing = Vec::new();
        let mut field = |name: &str| -> String {
            match body.get(name).and_then(scalar_to_string) {
                Some(value) => value,
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let credential = Credential {
            access_key: field("tmp_access_key"),
            secret_key: field("tmp_secret_key"),
            session_token: field("tmp_session_token"),
            cert_auth_data: field("cert_auth_data"),
            cluster_endpoint: field("cluster_endpoint"),
            namespace: field("namespace"),
            account_id: field("aws_account_id"),
        };

        if !missing.is_empty() {
            return Err(TunnelError::MalformedResponse { missing });
        }
        Ok(credential)
    }
}

/// Account ids may come back as JSON numbers
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Where the task's shell lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodLocator {
    pub namespace: String,
    pub pod: String,
    /// Container name (None = pod's default container)
    pub container: Option<String>,
}

impl PodLocator {
    /// Task pods are named after the task they run
    pub fn for_task(task_name: &str, credential: &Credential) -> Self {
        Self {
            namespace: credential.namespace.clone(),
            pod: task_name.to_string(),
            container: None,
        }
    }

    /// Target a specific container
    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container;
        self
    }
}

impl fmt::Display for PodLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.container {
            Some(ref c) => write!(f, "{}/{} ({})", self.namespace, self.pod, c),
            None => write!(f, "{}/{}", self.namespace, self.pod),
        }
    }
}

/// Terminal outcome of a session: the remote exit code, or the error that
/// ended it
pub type SessionResult = TunnelResult<i32>;
