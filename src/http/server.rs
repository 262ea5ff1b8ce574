//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay's handlers
//! - Wire up middleware (request ID, tracing, body limit)
//! - Build a per-request context tied to shutdown and the forward deadline
//! - Serve on a bound listener until shutdown

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, RawQuery, State},
    http::{HeaderMap, Request},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::RelayConfig;
use crate::forward::RequestContext;
use crate::gateway::{ErrorResponse, EventGateway, EventResponse, HealthResponse};
use crate::http::request::{read_form, request_id, MakeRelayRequestId};
use crate::http::response::not_found;
use crate::http::status::StatusView;
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<EventGateway>,
    /// Configured bind address until `run` replaces it with the bound socket.
    pub listen_address: String,
    pub forward_timeout: Duration,
    pub shutdown: Shutdown,
}

/// HTTP front end of the relay.
pub struct RelayServer {
    state: AppState,
    max_body_bytes: usize,
}

impl RelayServer {
    pub fn new(config: &RelayConfig, gateway: Arc<EventGateway>, shutdown: Shutdown) -> Self {
        let state = AppState {
            gateway,
            listen_address: config.listener.bind_address(),
            forward_timeout: config.downstream.timeout(),
            shutdown,
        };

        Self {
            state,
            max_body_bytes: config.limits.max_body_bytes,
        }
    }

    /// Router with state and middleware applied.
    pub fn router(&self) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id(request.headers()),
            )
        });

        Router::new()
            .route("/event", get(query_events).post(submit_event))
            .route("/health", get(health))
            .route("/status", get(status))
            .fallback(not_found)
            .with_state(self.state.clone())
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRelayRequestId))
                    .layer(trace)
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// shutdown is triggered.
    pub async fn run(mut self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");
        self.state.listen_address = addr.to_string();

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn submit_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> Result<EventResponse, ErrorResponse> {
    let span = tracing::info_span!("event_submit", request_id = %request_id(&headers));
    let form = read_form(&headers, query.as_deref(), body)
        .instrument(span.clone())
        .await;
    let ctx = RequestContext::new(state.shutdown.child_token()).with_timeout(state.forward_timeout);

    state
        .gateway
        .handle_event_submit(form, &ctx)
        .instrument(span)
        .await
}

async fn query_events(State(state): State<AppState>) -> EventResponse {
    state.gateway.handle_event_query()
}

async fn health(State(state): State<AppState>) -> HealthResponse {
    state.gateway.handle_health_query()
}

async fn status(State(state): State<AppState>) -> Json<StatusView> {
    Json(StatusView::collect(&state.gateway, &state.listen_address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::{OutboundRequest, Transport, TransportError, TransportResponse};
    use crate::gateway::ResponseStatus;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::{header::CONTENT_TYPE, Method, StatusCode};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Answers every POST with a fixed status and records the bodies.
    struct FixedTransport {
        status: u16,
        bodies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn post(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
            self.bodies.lock().unwrap().push(request.body);
            Ok(TransportResponse {
                status: self.status,
                body: String::new(),
            })
        }
    }

    fn server(status: u16, max_body_bytes: usize) -> (RelayServer, Arc<FixedTransport>) {
        let mut config = RelayConfig::default();
        config.downstream.url = "http://ha.local:8123".into();
        config.downstream.auth_token = "supersecrettoken".into();
        config.downstream.webhook_id = "hook".into();
        config.limits.max_body_bytes = max_body_bytes;

        let transport = Arc::new(FixedTransport {
            status,
            bodies: Mutex::new(Vec::new()),
        });
        let gateway =
            EventGateway::new(config.downstream.gateway_config(), transport.clone()).unwrap();
        let server = RelayServer::new(&config, Arc::new(gateway), Shutdown::new());
        (server, transport)
    }

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&body).unwrap())
    }

    fn post_form(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn post_multipart(body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/event")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XX")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_submit_forwards_and_counts() {
        let (server, transport) = server(200, 1024);
        let (status, headers, body) =
            call(server.router(), post_form("/event?station=a", "temp=72")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(body["status"], "OK");
        assert_eq!(body["eventCount"], 1);
        assert_eq!(body["errorCount"], 0);
        assert_eq!(*transport.bodies.lock().unwrap(), ["station=a&temp=72"]);
    }

    #[tokio::test]
    async fn test_multipart_submit_is_forwarded() {
        let (server, transport) = server(200, 1024);
        let body = "--XX\r\n\
            Content-Disposition: form-data; name=\"temp\"\r\n\r\n\
            72\r\n\
            --XX--\r\n";
        let (status, _, body) = call(server.router(), post_multipart(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "OK", "eventCount": 1, "errorCount": 0}));
        assert_eq!(*transport.bodies.lock().unwrap(), ["temp=72"]);
    }

    #[tokio::test]
    async fn test_downstream_rejection_is_500() {
        let (server, _) = server(404, 1024);
        let (status, _, body) = call(server.router(), post_form("/event", "temp=72")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(error.status, ResponseStatus::Error);
        assert_eq!(error.message, "error forwarding event to http://ha.local:8123/api/webhook/hook");
        assert!(error.error.contains("Response code: 404"), "{}", error.error);
        assert_eq!((error.event_count, error.error_count), (0, 1));
    }

    #[tokio::test]
    async fn test_oversized_body_is_form_error() {
        let (server, transport) = server(200, 8);
        let (status, _, body) =
            call(server.router(), post_form("/event", "temp=72&humidity=55")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "error retrieving form parameters");
        assert_eq!(body["errorCount"], 1);
        assert!(transport.bodies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queries_do_not_count() {
        let (server, _) = server(200, 1024);

        let (status, _, body) = call(server.router(), get_request("/event")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "OK", "eventCount": 0, "errorCount": 0}));

        let (status, _, body) = call(server.router(), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "OK"}));

        let (_, _, body) = call(server.router(), get_request("/event")).await;
        assert_eq!(body["eventCount"], 0);
    }

    #[tokio::test]
    async fn test_status_masks_token() {
        let (server, _) = server(200, 1024);
        let (status, _, body) = call(server.router(), get_request("/status")).await;

        assert_eq!(status, StatusCode::OK);
        let view: StatusView = serde_json::from_value(body).unwrap();
        assert_eq!(view.auth_token, "supe...");
        assert_eq!(view.webhook_id, "hook");
        assert_eq!(view.downstream_url, "http://ha.local:8123");
        assert_eq!(view.address, "0.0.0.0:8181");
    }

    #[tokio::test]
    async fn test_status_reports_bound_address() {
        let (server, _) = server(200, 1024);
        let shutdown = server.state.shutdown.clone();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(server.run(listener));

        let view: StatusView = reqwest::get(format!("http://{addr}/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view.address, addr.to_string());

        shutdown.trigger();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (server, _) = server(200, 1024);
        let (status, _, body) = call(server.router(), get_request("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"message": "Not Found"}));
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let (server, _) = server(200, 1024);
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "caller-id")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = call(server.router(), request).await;
        assert_eq!(headers["x-request-id"], "caller-id");
    }
}
