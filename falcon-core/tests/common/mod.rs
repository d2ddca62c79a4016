//! In-process mock of the fal.ai run API
//!
//! Every POST is recorded and answered with the configured [`Reply`]. Result
//! images point back at `GET /files/<name>` on the same server.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Bytes served for every downloaded image.
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock-image";

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// How the mock answers POSTs.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `count` images (or as many as `num_images` asks for when `None`)
    Images(Option<usize>),
    /// A body with a `detail` field
    Detail(StatusCode, Value),
    /// A non-JSON error body
    Plain(StatusCode, &'static str),
}

#[derive(Clone)]
struct MockState {
    base_url: String,
    calls: Arc<Mutex<Vec<Recorded>>>,
    reply: Arc<Mutex<Reply>>,
}

pub struct MockFal {
    pub base_url: String,
    calls: Arc<Mutex<Vec<Recorded>>>,
    reply: Arc<Mutex<Reply>>,
}

impl MockFal {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let reply = Arc::new(Mutex::new(Reply::Images(None)));

        let state = MockState {
            base_url: base_url.clone(),
            calls: calls.clone(),
            reply: reply.clone(),
        };
        let app = Router::new().fallback(handle).with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            calls,
            reply,
        }
    }

    pub fn reply_with(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().trim_start_matches('/').to_string();

    if method == Method::GET && path.starts_with("files/") {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            IMAGE_BYTES.to_vec(),
        )
            .into_response();
    }

    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.calls.lock().unwrap().push(Recorded {
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    let reply = state.reply.lock().unwrap().clone();
    match reply {
        Reply::Images(count) => {
            let count = count.unwrap_or_else(|| {
                body.get("num_images").and_then(Value::as_u64).unwrap_or(1) as usize
            });
            let images: Vec<Value> = (1..=count)
                .map(|i| {
                    json!({
                        "url": format!("{}/files/{}.png", state.base_url, i),
                        "width": 1024,
                        "height": 1024,
                        "content_type": "image/png",
                    })
                })
                .collect();
            Json(json!({ "images": images, "seed": 42 })).into_response()
        }
        Reply::Detail(status, detail) => (status, Json(json!({ "detail": detail }))).into_response(),
        Reply::Plain(status, text) => (status, text).into_response(),
    }
}
