//! End-to-end tests against a local axum backend.
//!
//! Exercises the real adapters (tokio-tungstenite connector, reqwest client)
//! through the session controller over loopback TCP.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

use chatlink::adapters::{HttpChatBackend, WsConnector};
use chatlink::application::{
    SessionController, SessionHandle, SessionSettings, SessionSnapshot, REALTIME_FAILED_WARNING,
};
use chatlink::config::BackendConfig;
use chatlink::domain::conversation::Sender;
use chatlink::domain::session::ConnectionState;
use chatlink::ports::{ApiError, ChatBackend, ChatRequest, ModelSwitchRequest};

const T0: &str = "2024-01-01T00:00:00Z";

// =============================================================================
// Fake backend
// =============================================================================

#[derive(Clone, Default)]
struct FakeBackend {
    stream_ids: Arc<Mutex<Vec<String>>>,
    chat_bodies: Arc<Mutex<Vec<Value>>>,
    connections: Arc<AtomicUsize>,
    /// Close this many connections right after the handshake.
    drop_first: usize,
}

async fn stream(
    ws: WebSocketUpgrade,
    Path(conversation_id): Path<String>,
    State(state): State<FakeBackend>,
) -> Response {
    state.stream_ids.lock().unwrap().push(conversation_id);
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: FakeBackend) {
    let index = state.connections.fetch_add(1, Ordering::SeqCst);
    if index < state.drop_first {
        let _ = socket.send(WsMessage::Close(None)).await;
        return;
    }

    let welcome = json!({"type": "system", "message": "Connected to chat"});
    if socket.send(WsMessage::Text(welcome.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        if let WsMessage::Text(text) = message {
            let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            let reply = json!({
                "response": format!("ws: {}", body["message"].as_str().unwrap_or_default()),
                "timestamp": T0,
            });
            if socket.send(WsMessage::Text(reply.to_string())).await.is_err() {
                return;
            }
        }
    }
}

async fn chat(State(state): State<FakeBackend>, Json(body): Json<Value>) -> Json<Value> {
    state.chat_bodies.lock().unwrap().push(body.clone());
    Json(json!({
        "response": format!("http: {}", body["message"].as_str().unwrap_or_default()),
        "timestamp": T0,
        "conversation_id": body["conversation_id"],
    }))
}

async fn stats() -> Json<Value> {
    Json(json!({"total_conversations": 2, "total_messages": 7}))
}

async fn models() -> Json<Value> {
    Json(json!({"available": {"ollama": ["llama3.2:1b"]}}))
}

async fn current_model() -> Json<Value> {
    Json(json!({
        "provider": "ollama",
        "model_name": "llama3.2:1b",
        "model_info": {"display_name": "Llama 3.2 1B"},
        "status": {"available": true}
    }))
}

async fn switch_model(Json(body): Json<Value>) -> Json<Value> {
    if body["model_name"] == "missing" {
        return Json(json!({"success": false, "message": "Model not available"}));
    }
    Json(json!({
        "success": true,
        "current_model": body["model_name"],
        "current_provider": body["provider"],
    }))
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn garbage() -> &'static str {
    "not json"
}

fn api_routes() -> Router<FakeBackend> {
    Router::new()
        .route("/chat", post(chat))
        .route("/stats", get(stats))
        .route("/models", get(models))
        .route("/models/current", get(current_model))
        .route("/models/switch", post(switch_model))
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_backend(state: FakeBackend) -> SocketAddr {
    let app = api_routes()
        .route("/stream/:conversation_id", get(stream))
        .with_state(state);
    serve(app).await
}

/// Backend without a streaming endpoint, so every handshake fails.
async fn spawn_http_only_backend(state: FakeBackend) -> SocketAddr {
    serve(api_routes().with_state(state)).await
}

fn start_session(addr: SocketAddr, reconnect_delay: Duration) -> (SessionHandle, Arc<HttpChatBackend>) {
    let config = BackendConfig {
        api_url: format!("http://{}", addr),
        ..Default::default()
    };
    let backend = Arc::new(HttpChatBackend::from_config(&config).unwrap());
    let settings = SessionSettings::new(config.stream_base().unwrap())
        .with_reconnect_delay(reconnect_delay);
    let handle = SessionController::spawn(settings, Arc::new(WsConnector::new()), backend.clone());
    (handle, backend)
}

async fn until(
    handle: &SessionHandle,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    timeout(Duration::from_secs(10), handle.wait_for(predicate))
        .await
        .expect("condition not reached")
        .expect("session closed")
}

// =============================================================================
// Session over real transports
// =============================================================================

#[tokio::test]
async fn streaming_round_trip_over_websocket() {
    let state = FakeBackend::default();
    let addr = spawn_backend(state.clone()).await;
    let (handle, _backend) = start_session(addr, Duration::from_secs(5));

    until(&handle, |s| s.connection == ConnectionState::Connected).await;
    handle.send_message("hello").await.unwrap();
    let done = until(&handle, |s| !s.pending).await;

    let texts: Vec<(Sender, &str)> = done.messages.iter().map(|m| (m.sender(), m.text())).collect();
    assert_eq!(texts, vec![(Sender::User, "hello"), (Sender::Bot, "ws: hello")]);
    assert_eq!(done.messages[1].timestamp(), T0);
    assert!(state.chat_bodies.lock().unwrap().is_empty());
    assert_eq!(
        *state.stream_ids.lock().unwrap(),
        vec![handle.conversation_id().to_string()]
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_stream_endpoint_falls_back_to_http() {
    let state = FakeBackend::default();
    let addr = spawn_http_only_backend(state.clone()).await;
    let (handle, _backend) = start_session(addr, Duration::from_secs(5));

    let failed = until(&handle, |s| s.connection == ConnectionState::Error).await;
    assert_eq!(failed.warning.as_deref(), Some(REALTIME_FAILED_WARNING));

    handle.send_message("ping").await.unwrap();
    let done = until(&handle, |s| !s.pending && s.messages.len() == 2).await;

    assert_eq!(done.messages[1].text(), "http: ping");
    let bodies = state.chat_bodies.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec![json!({"message": "ping", "conversation_id": handle.conversation_id().to_string()})]
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn server_close_triggers_reconnect() {
    let state = FakeBackend {
        drop_first: 1,
        ..Default::default()
    };
    let addr = spawn_backend(state.clone()).await;
    let (handle, _backend) = start_session(addr, Duration::from_millis(200));

    // The first connection may open and close before a snapshot is observed,
    // so wait for the second handshake directly.
    let ids_seen = state.stream_ids.clone();
    until(&handle, move |s| {
        s.connection == ConnectionState::Connected && ids_seen.lock().unwrap().len() == 2
    })
    .await;

    let ids = state.stream_ids.lock().unwrap().clone();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);

    handle.shutdown().await.unwrap();
}

// =============================================================================
// HTTP client
// =============================================================================

#[tokio::test]
async fn http_client_reads_auxiliary_endpoints() {
    let addr = spawn_backend(FakeBackend::default()).await;
    let backend = HttpChatBackend::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();

    let stats = backend.fetch_stats().await.unwrap();
    assert_eq!(stats["total_messages"], 7);

    let models = backend.list_models().await.unwrap();
    assert_eq!(models["available"]["ollama"][0], "llama3.2:1b");

    let current = backend.current_model().await.unwrap();
    assert_eq!(current.display_name(), "Llama 3.2 1B");
}

#[tokio::test]
async fn http_client_switches_models() {
    let addr = spawn_backend(FakeBackend::default()).await;
    let backend = HttpChatBackend::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();

    let ok = backend
        .switch_model(ModelSwitchRequest::new("ollama", "llama3.2:3b"))
        .await
        .unwrap();
    assert!(ok.success);
    assert_eq!(ok.current_model.as_deref(), Some("llama3.2:3b"));

    let rejected = backend
        .switch_model(ModelSwitchRequest::new("ollama", "missing"))
        .await
        .unwrap();
    assert!(!rejected.success);
    assert_eq!(rejected.message.as_deref(), Some("Model not available"));
}

#[tokio::test]
async fn http_client_maps_status_and_parse_failures() {
    let app = Router::new()
        .route("/chat", post(broken))
        .route("/stats", get(garbage));
    let addr = serve(app).await;
    let backend = HttpChatBackend::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();
    let id = chatlink::domain::foundation::ConversationId::new();

    let status = backend.send_chat(ChatRequest::new("x", &id)).await;
    assert_eq!(status, Err(ApiError::status(500, "boom")));

    let parse = backend.fetch_stats().await;
    assert!(matches!(parse, Err(ApiError::Parse(_))));
}
