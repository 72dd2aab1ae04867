use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

use xdr_agent::{
    config::{secret::SecretSource, AppConfig, ServerConfig},
    error::{AppError, Result},
    pipeline::{
        sinks::{http::HttpSink, Sink},
        Event, EventKind, Pipeline, PipelineState,
    },
    server::{routes::create_router, serve},
    signature::{HmacSigner, DEFAULT_SIGNATURE_HEADER},
    sources::build_producers,
};

fn server_config(secret: Option<&str>) -> ServerConfig {
    ServerConfig {
        port: 0,
        secret: secret.map(|s| SecretSource::Plain(s.to_string())),
        header_name: DEFAULT_SIGNATURE_HEADER.to_string(),
    }
}

fn signer(secret: &str) -> HmacSigner {
    HmacSigner::new(secret.to_string(), DEFAULT_SIGNATURE_HEADER.to_string())
}

const ALERT: &str = r#"{"agent_id":"agent-macbook-01","event_type":"UNAUTHORIZED_ACCESS","details":"Process 'miner_x' started (PID: 9999)","timestamp":1714564800}"#;

#[tokio::test]
async fn test_audit_endpoint_accepts_signed_alert() {
    let app = create_router(&server_config(Some("integration_test_secret"))).unwrap();
    let signature = signer("integration_test_secret").sign(ALERT.as_bytes()).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/audit")
                .header(DEFAULT_SIGNATURE_HEADER, signature)
                .header("content-type", "application/json")
                .body(Body::from(ALERT))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/-/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_audit_endpoint_rejects_bad_or_missing_signature() {
    let app = create_router(&server_config(Some("integration_test_secret"))).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/audit")
                .header(DEFAULT_SIGNATURE_HEADER, "sha256=invalidsignature")
                .body(Body::from(ALERT))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/audit")
                .body(Body::from(ALERT))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_audit_endpoint_without_secret() {
    let app = create_router(&server_config(None)).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/audit")
                .body(Body::from(ALERT))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/audit")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/audit")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_http_sink_against_live_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(&server_config(Some("shared"))).unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, router, async move {
        let _ = stop_rx.await;
    }));

    let url = format!("http://{}/audit", addr);
    let event = Event::new("file-monitor", EventKind::FileModified, "/etc/passwd accessed by unknown user");

    let signed = HttpSink::new(&url, "agent-01", Duration::from_secs(5), Some(signer("shared"))).unwrap();
    signed.send(&event).await.unwrap();

    let wrong_key = HttpSink::new(&url, "agent-01", Duration::from_secs(5), Some(signer("other"))).unwrap();
    assert!(matches!(wrong_key.send(&event).await, Err(AppError::Sink(_))));

    let unsigned = HttpSink::new(&url, "agent-01", Duration::from_secs(5), None).unwrap();
    assert!(matches!(unsigned.send(&event).await, Err(AppError::Sink(_))));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[derive(Default)]
struct Recording {
    seen: Mutex<Vec<Event>>,
}

#[async_trait::async_trait]
impl Sink for Recording {
    async fn send(&self, event: &Event) -> Result<()> {
        self.seen.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_configured_agent_end_to_end() {
    let config = AppConfig::from_json(
        r#"{
            "agent_id": "agent-01",
            "pipeline": { "queue_capacity": 2, "worker_count": 3, "shutdown_grace_ms": 500 },
            "sink": { "type": "log" },
            "producers": [
                { "id": "file-monitor", "kind": "FILE_MODIFIED", "details": "/etc/passwd", "tick_interval_ms": 20 },
                { "id": "process-monitor", "kind": "PROCESS_START", "details": "miner_x", "tick_interval_ms": 30,
                  "emit": { "type": "every", "n": 2 } },
                { "id": "quiet-monitor", "kind": "NETWORK_CONNECTION", "details": "-", "tick_interval_ms": 10,
                  "emit": { "type": "never" } }
            ]
        }"#,
    )
    .unwrap();

    let sink = Arc::new(Recording::default());
    let coordinator = Pipeline::new(config.pipeline.clone(), sink.clone())
        .with_producers(build_producers(&config.producers).unwrap())
        .start()
        .unwrap();
    let states = coordinator.subscribe();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(coordinator.run_until(async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_tx.send(()).unwrap();

    let report = run.await.unwrap().unwrap();
    assert_eq!(*states.borrow(), PipelineState::Stopped);

    let seen = sink.seen.lock().unwrap();
    assert!(report.emitted > 0);
    assert_eq!(report.delivered, report.emitted);
    assert_eq!(seen.len() as u64, report.emitted);
    assert!(seen.iter().all(|e| e.source_id() != "quiet-monitor"));
    assert!(seen.iter().any(|e| e.kind() == EventKind::FileModified));
}
