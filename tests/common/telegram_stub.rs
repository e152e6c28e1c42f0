//! Local HTTP server standing in for the Telegram Bot API.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use teloxide::Bot;
use tokio::task::JoinHandle;

use super::{text_update_json, CHAT_ID};

/// Decides the reply to a request: method name, raw body, and how many
/// earlier calls the same method received
pub type Responder = dyn Fn(&str, &str, usize) -> (StatusCode, Value) + Send + Sync;

/// One request received by the stub
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub body: String,
}

#[derive(Clone)]
struct StubState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    responder: Arc<Responder>,
}

pub struct TelegramStub {
    requests: Arc<Mutex<Vec<Recorded>>>,
    base_url: String,
    server: JoinHandle<()>,
}

impl TelegramStub {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str, &str, usize) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let state = StubState {
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        };
        let requests = state.requests.clone();

        let app = Router::new().fallback(handle).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            requests,
            base_url: format!("http://{addr}/"),
            server,
        }
    }

    /// Bot whose requests go to this stub
    pub fn bot(&self) -> Bot {
        let url = reqwest::Url::parse(&self.base_url).expect("stub url");
        Bot::new("123456:TEST-TOKEN").set_api_url(url)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.method).collect()
    }
}

impl Drop for TelegramStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(State(state): State<StubState>, uri: Uri, body: Bytes) -> (StatusCode, Json<Value>) {
    // The Bot API treats method names case-insensitively and teloxide sends
    // them PascalCase; record the documented camelCase spelling
    let raw = uri.path().rsplit('/').next().unwrap_or_default();
    let mut chars = raw.chars();
    let method = match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    };
    let body = String::from_utf8_lossy(&body).into_owned();

    let previous = {
        let mut requests = state.requests.lock();
        let previous = requests.iter().filter(|r| r.method == method).count();
        requests.push(Recorded {
            method: method.clone(),
            body: body.clone(),
        });
        previous
    };

    let (status, reply) = (state.responder)(&method, &body, previous);
    (status, Json(reply))
}

pub fn ok(result: Value) -> (StatusCode, Value) {
    (StatusCode::OK, json!({ "ok": true, "result": result }))
}

/// A message as the Bot API returns it after sending
pub fn sent_message() -> Value {
    text_update_json(1, CHAT_ID, "sent")["message"].clone()
}

pub fn rate_limited(retry_after: u64) -> (StatusCode, Value) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        json!({
            "ok": false,
            "error_code": 429,
            "description": format!("Too Many Requests: retry after {retry_after}"),
            "parameters": { "retry_after": retry_after }
        }),
    )
}

pub fn bad_request(description: &str) -> (StatusCode, Value) {
    (
        StatusCode::BAD_REQUEST,
        json!({
            "ok": false,
            "error_code": 400,
            "description": format!("Bad Request: {description}")
        }),
    )
}
