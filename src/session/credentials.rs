//! Credential broker
//!
//! Exchanges the caller's identity token and a task name for short-lived
//! cluster credentials and the location of the task's pod.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use super::models::{Credential, PodLocator};
use crate::config::BrokerSettings;
use crate::error::{TunnelError, TunnelResult};

/// Fetches per-session cluster credentials from the pod-exec-info endpoint.
///
/// One request per call; retrying is left to whoever runs the session.
pub struct CredentialBroker {
    client: reqwest::Client,
    settings: BrokerSettings,
}

impl CredentialBroker {
    /// Create a broker for the given endpoint settings
    pub fn new(settings: BrokerSettings) -> TunnelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client, settings })
    }

    /// Exchange `identity_token` for credentials to exec into `task_name`
    pub async fn fetch(
        &self,
        identity_token: &str,
        task_name: &str,
    ) -> TunnelResult<(Credential, PodLocator)> {
        tracing::info!("Requesting exec credentials for task {}", task_name);

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(identity_token)
            .json(&serde_json::json!({ "task_name": task_name }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("Failed to read rejection body: {}", e);
                    String::new()
                }
            };
            return Err(TunnelError::Auth(format!("{}: {}", status, body.trim())));
        }
        // Any other failure status is a broker fault
        let response = response.error_for_status()?;

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Broker response is not JSON: {}", e);
                Value::Null
            }
        };

        let credential = Credential::from_response(&body)?;
        let locator = PodLocator::for_task(task_name, &credential);

        tracing::debug!(
            "Received credentials for account {} in namespace {}",
            credential.account_id,
            credential.namespace
        );

        Ok((credential, locator))
    }
}
