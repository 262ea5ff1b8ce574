//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ecowitt_relay::config::RelayConfig;
use ecowitt_relay::lifecycle::startup::{serve, StartupError};
use ecowitt_relay::lifecycle::Shutdown;

pub const AUTH_TOKEN: &str = "long-lived-test-token";
pub const WEBHOOK_ID: &str = "ecowitt-hook";

/// One request as seen by the stub downstream.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

type Responder = dyn Fn(&Captured) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct StubState {
    captured: Arc<Mutex<Vec<Captured>>>,
    respond: Arc<Responder>,
    delay: Duration,
}

/// Stand-in for Home Assistant that records what it receives.
pub struct Downstream {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl Downstream {
    /// Answer every request with a fixed status and body.
    pub async fn fixed(status: u16, body: &str) -> Self {
        let body = body.to_string();
        Self::start(Duration::ZERO, move |_| (status, body.clone())).await
    }

    /// Answer after `delay`; the response decides per request.
    pub async fn start<F>(delay: Duration, respond: F) -> Self
    where
        F: Fn(&Captured) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Arc::new(Mutex::new(Vec::new()));

        let state = StubState {
            captured: captured.clone(),
            respond: Arc::new(respond),
            delay,
        };
        let app = Router::new().fallback(handle).with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, captured }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = Captured {
        method,
        path: uri.path().to_string(),
        authorization: header_text(header::AUTHORIZATION),
        content_type: header_text(header::CONTENT_TYPE),
        body,
    };
    state.captured.lock().unwrap().push(request.clone());

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    let (status, body) = (state.respond)(&request);
    (StatusCode::from_u16(status).unwrap(), body)
}

/// A relay running on an ephemeral port.
pub struct Relay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: JoinHandle<Result<(), StartupError>>,
}

impl Relay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to drain.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("relay did not stop")
            .unwrap()
            .unwrap();
    }
}

pub fn relay_config(downstream_url: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.address = "127.0.0.1".into();
    config.listener.port = 0;
    config.downstream.url = downstream_url.to_string();
    config.downstream.auth_token = AUTH_TOKEN.into();
    config.downstream.webhook_id = WEBHOOK_ID.into();
    config
}

pub async fn start_relay(config: RelayConfig) -> Relay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(serve(config, listener, shutdown.clone()));
    Relay {
        addr,
        shutdown,
        handle,
    }
}

/// Client with a generous timeout so a hung relay fails the test.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .unwrap()
}

pub async fn get_json(client: &reqwest::Client, url: &str) -> (u16, serde_json::Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

pub async fn post_form(
    client: &reqwest::Client,
    url: &str,
    fields: &[(&str, &str)],
) -> (u16, serde_json::Value) {
    let res = client.post(url).form(fields).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}
