//! In-process HTTP stub used by the provider tests.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One request the stub received.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }
}

struct Stub {
    status: StatusCode,
    content_type: String,
    reply: Vec<u8>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A server on 127.0.0.1 that answers every request with a canned response.
pub(crate) struct StubServer {
    pub url: String,
    stub: Arc<Stub>,
}

impl StubServer {
    pub async fn start(status: u16, content_type: &str, reply: impl Into<Vec<u8>>) -> Self {
        let stub = Arc::new(Stub {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.to_string(),
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/{*path}", any(handle))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Self {
            url: format!("http://{addr}/endpoint"),
            stub,
        }
    }

    pub async fn json(status: u16, reply: Value) -> Self {
        Self::start(status, "application/json", reply.to_string()).await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.stub.requests.lock().unwrap().clone()
    }
}

async fn handle(State(stub): State<Arc<Stub>>, headers: HeaderMap, body: Bytes) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    stub.requests.lock().unwrap().push(RecordedRequest {
        authorization,
        body: body.to_vec(),
    });
    (
        stub.status,
        [(header::CONTENT_TYPE, stub.content_type.clone())],
        stub.reply.clone(),
    )
        .into_response()
}
