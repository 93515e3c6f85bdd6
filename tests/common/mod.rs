#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

#[derive(Clone, Debug)]
pub struct Captured {
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// A stand-in HTTP endpoint answering every POST with a canned reply and
/// recording the last request it saw.
#[derive(Clone)]
pub struct FakeUpstream {
    status: StatusCode,
    body: String,
    last: Arc<Mutex<Option<Captured>>>,
}

impl FakeUpstream {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub fn last_request(&self) -> Option<Captured> {
        self.last.lock().unwrap().clone()
    }

    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/", post(reply))
            .layer(DefaultBodyLimit::disable())
            .with_state(self.clone());
        spawn(app).await
    }
}

async fn reply(State(fake): State<FakeUpstream>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    *fake.last.lock().unwrap() = Some(Captured { headers, body });
    (
        fake.status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        fake.body.clone(),
    )
}

/// A port nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}
