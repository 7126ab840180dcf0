//! In-process mock of the REST API shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone, Default)]
pub struct MockApi {
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
    /// Scripted replies, used before falling back to the default behaviour.
    pub replies: Arc<Mutex<VecDeque<(u16, Value)>>>,
}

impl MockApi {
    pub fn reply(&self, status: u16, body: Value) {
        self.replies.lock().unwrap().push_back((status, body));
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Start serving on an ephemeral port; returns the base URL.
    pub async fn start(&self) -> String {
        let app = Router::new().fallback(handle).with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

async fn handle(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    api.seen.lock().unwrap().push(SeenRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        headers,
        body: parsed.clone(),
    });

    if let Some((status, reply)) = api.replies.lock().unwrap().pop_front() {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, Json(reply)).into_response();
    }

    let reply = match (method, uri.path()) {
        (Method::GET, "/v1/_me") => json!({"type": "app", "name": "Test", "id": "app:test"}),
        (Method::POST, "/v1/_newkeys") => json!({"accessKey": "app:test", "secretKey": "fresh"}),
        (Method::DELETE, _) => Value::Null,
        (Method::GET, "/v1/search/") => json!({"items": [], "totalHits": 0}),
        (Method::GET, "/v1/_batch") => json!([{"id": "1"}]),
        _ => parsed,
    };
    match reply {
        Value::Null => StatusCode::OK.into_response(),
        v => Json(v).into_response(),
    }
}
