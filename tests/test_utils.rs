//! Test utilities for taskshell
//!
//! Fixtures for broker responses, a scripted in-memory exec transport and a
//! fake credential broker served by axum.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use taskshell::config::{AppConfig, BrokerSettings};
use taskshell::kubernetes::{FrameTransport, TransportEvent};
use taskshell::terminal::Frame;
use taskshell::{TunnelError, TunnelResult};

pub const BROKER_PATH: &str = "/sdk/pod-exec-info";

/// A complete, valid broker response
pub fn broker_response() -> Value {
    json!({
        "tmp_access_key": "ASIAEXAMPLE",
        "tmp_secret_key": "wJalrXUtnFEMI/K7MDENG",
        "tmp_session_token": "FwoGZXIvYXdzEBYaDH...",
        "cert_auth_data": "LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0t",
        "cluster_endpoint": "https://ABCDEF.gr7.us-west-2.eks.amazonaws.com",
        "namespace": "task-ns",
        "aws_account_id": "812206152185"
    })
}

/// Binary message for channel `id`
pub fn binary(id: u8, payload: &[u8]) -> TransportEvent {
    let mut data = vec![id];
    data.extend_from_slice(payload);
    TransportEvent::Binary(data)
}

/// Status-channel message carrying `json`
pub fn status(json: &str) -> TransportEvent {
    binary(3, json.as_bytes())
}

/// One step of a scripted transport
pub enum Step {
    /// Deliver immediately
    Now(TransportEvent),
    /// Deliver once at least this many frames have been sent
    AfterSent(usize, TransportEvent),
    /// Fail the stream
    Fail(String),
}

/// Exec transport that replays a script and records what was sent
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    pub sent: Arc<Mutex<Vec<Frame>>>,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn events(events: Vec<TransportEvent>) -> Self {
        Self::new(events.into_iter().map(Step::Now).collect())
    }

    pub fn was_closed(closed: &Arc<AtomicBool>) -> bool {
        closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameTransport for ScriptedTransport {
    async fn send_frame(&mut self, frame: Frame) -> TunnelResult<()> {
        self.sent.lock().push(frame);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TunnelResult<TransportEvent>> {
        if let Some(Step::AfterSent(n, _)) = self.steps.front() {
            if self.sent.lock().len() < *n {
                return std::future::pending().await;
            }
        }
        match self.steps.pop_front()? {
            Step::Now(event) | Step::AfterSent(_, event) => Some(Ok(event)),
            Step::Fail(reason) => Some(Err(TunnelError::Connect(reason))),
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// What the fake broker saw
#[derive(Debug, Clone)]
pub struct BrokerRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct BrokerState {
    status: StatusCode,
    response: Value,
    requests: Arc<Mutex<Vec<BrokerRequest>>>,
}

async fn pod_exec_info(
    State(state): State<BrokerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    state.requests.lock().push(BrokerRequest {
        authorization,
        body,
    });
    (state.status, Json(state.response.clone()))
}

/// Spin up a broker on a random port answering every request with
/// `status` and `response`. Returns the endpoint URL and the request log.
pub async fn start_fake_broker(
    status: StatusCode,
    response: Value,
) -> (String, Arc<Mutex<Vec<BrokerRequest>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = BrokerState {
        status,
        response,
        requests: requests.clone(),
    };
    let router = Router::new()
        .route(BROKER_PATH, post(pod_exec_info))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to ephemeral port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}{BROKER_PATH}"), requests)
}

/// Broker settings pointing at `endpoint`
pub fn broker_settings(endpoint: &str) -> BrokerSettings {
    BrokerSettings {
        endpoint: endpoint.to_string(),
        timeout_secs: 5,
    }
}

/// Config pointing at `endpoint` with a token file inside `dir`
pub fn app_config(endpoint: &str, dir: &std::path::Path) -> AppConfig {
    let token_path = dir.join("token");
    std::fs::write(&token_path, "test-identity-token\n").expect("write token");
    AppConfig {
        broker: broker_settings(endpoint),
        token_path: Some(token_path),
        ..Default::default()
    }
}
