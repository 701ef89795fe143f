//! In-process mock of the gift code API for tests
//!
//! Every consume call is recorded so tests can assert which (user, code)
//! pairs actually reached the server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default)]
struct MockState {
    verify_reply: Option<Value>,
    users_reply: Option<Value>,
    /// (target uid, code) -> error token; absent means success
    consume_errors: HashMap<(u64, String), String>,
    consumed: Vec<(u64, String)>,
    users_calls: usize,
}

#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users endpoint answers `ok` with these records.
    pub fn users(self, users: Value) -> Self {
        self.state.lock().unwrap().users_reply =
            Some(json!({"info": "ok", "data": {"users": users}}));
        self
    }

    /// Users endpoint answers with this error token.
    pub fn users_error(self, token: &str) -> Self {
        self.state.lock().unwrap().users_reply = Some(json!({"info": token}));
        self
    }

    pub fn verify_error(self, token: &str) -> Self {
        self.state.lock().unwrap().verify_reply = Some(json!({"info": token}));
        self
    }

    /// Consuming `code` for `uid` answers with this error token.
    pub fn consume_error(self, uid: u64, code: &str, token: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .consume_errors
            .insert((uid, code.to_string()), token.to_string());
        self
    }

    /// Every (target uid, code) pair sent to the consume endpoint, in order.
    pub fn consumed(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().consumed.clone()
    }

    pub fn users_calls(&self) -> usize {
        self.state.lock().unwrap().users_calls
    }

    /// Serve on an ephemeral port and return the base URL.
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/verify-afk-code", post(verify))
            .route("/users", post(users))
            .route("/cd-key/consume", post(consume))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }
}

async fn verify(State(api): State<MockApi>) -> Json<Value> {
    let state = api.state.lock().unwrap();
    Json(state.verify_reply.clone().unwrap_or_else(|| json!({"info": "ok"})))
}

async fn users(State(api): State<MockApi>) -> Json<Value> {
    let mut state = api.state.lock().unwrap();
    state.users_calls += 1;
    Json(
        state
            .users_reply
            .clone()
            .unwrap_or_else(|| json!({"info": "ok", "data": {"users": []}})),
    )
}

async fn consume(State(api): State<MockApi>, Json(body): Json<Value>) -> Json<Value> {
    let uid = body["uid"].as_u64().unwrap();
    let code = body["cdkey"].as_str().unwrap().to_string();
    let mut state = api.state.lock().unwrap();
    let reply = match state.consume_errors.get(&(uid, code.clone())) {
        Some(token) => json!({"info": token}),
        None => json!({"info": "ok"}),
    };
    state.consumed.push((uid, code));
    Json(reply)
}
