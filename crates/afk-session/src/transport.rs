//! Authenticated transport for the gift code API
//!
//! Every call POSTs a JSON body built from `{game: "afk", uid: <player>}`
//! merged with the operation's fields, then reads back `{info, data?}`.
//! `info == "ok"` means success and `data` carries the payload; any other
//! value is a server error token classified by `FailureKind`. A body that
//! doesn't match that schema is a `MalformedResponse`, never classified.
//!
//! The HTTP status is not consulted: the API reports business errors in
//! `info`, and anything else shows up as a malformed body.

use std::sync::Arc;
use std::time::Duration;

use common::ApiConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::constants::{
    CDKEY_TYPE, CONSUME_ENDPOINT, GAME, INFO_OK, USERS_ENDPOINT, VERIFY_ENDPOINT,
};
use crate::cookies::{PersistentCookieStore, SessionDir, unix_now};
use crate::error::{Error, Result};

/// One linked in-game account as returned by the users endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: u64,
    pub name: String,
    pub svr_id: u64,
    pub level: u32,
    #[serde(default)]
    pub is_main: bool,
}

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct UsersPayload {
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// HTTP session for one player.
///
/// Owns the reqwest client and the player's persisted cookie store. Calls are
/// issued one at a time by the owner; nothing here is shared across players.
pub struct SessionTransport {
    uid: u64,
    base_url: String,
    client: reqwest::Client,
    cookies: Arc<PersistentCookieStore>,
}

impl SessionTransport {
    /// Build the transport, resuming any session saved for `uid` in `dir`.
    pub fn new(uid: u64, api: &ApiConfig, dir: SessionDir) -> Result<Self> {
        let cookies = Arc::new(PersistentCookieStore::open(uid, dir)?);
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;

        if !cookies.is_empty() {
            info!(uid, cookies = cookies.len(), "resuming saved session");
        }

        let mut base_url = api.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            uid,
            base_url,
            client,
            cookies,
        })
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Whether a saved or freshly set session cookie is present.
    pub fn has_session(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Submit the in-game verification code to authenticate the session.
    pub async fn verify(&self, code: u64) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("code".into(), Value::String(code.to_string()));
        self.post(VERIFY_ENDPOINT, fields).await?;
        info!(uid = self.uid, "session verified");
        Ok(())
    }

    /// Retrieve the in-game accounts linked to this player.
    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let Some(data) = self.post(USERS_ENDPOINT, Map::new()).await? else {
            return Ok(Vec::new());
        };
        let payload: UsersPayload = serde_json::from_value(data)
            .map_err(|e| Error::MalformedResponse(format!("POST /{USERS_ENDPOINT}: {e}")))?;
        debug!(uid = self.uid, users = payload.users.len(), "listed users");
        Ok(payload.users)
    }

    /// Redeem a gift code for one account. `None` targets the player's own id.
    pub async fn redeem_code(&self, code: &str, target: Option<u64>) -> Result<()> {
        let target = target.unwrap_or(self.uid);
        let mut fields = Map::new();
        fields.insert("type".into(), json!(CDKEY_TYPE));
        fields.insert("cdkey".into(), json!(code));
        // Overrides the session uid in the merged body
        fields.insert("uid".into(), json!(target));
        self.post(CONSUME_ENDPOINT, fields).await?;
        Ok(())
    }

    /// Release the HTTP client, purging expired cookies one last time.
    pub fn close(self) {
        if let Err(e) = self.cookies.purge_expired_at(unix_now()) {
            warn!(uid = self.uid, error = %e, "failed to persist session on close");
        }
        debug!(uid = self.uid, "transport closed");
    }

    fn base_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("game".into(), json!(GAME));
        payload.insert("uid".into(), json!(self.uid));
        payload
    }

    /// POST `fields` merged over the base payload and unwrap the envelope.
    async fn post(&self, endpoint: &str, fields: Map<String, Value>) -> Result<Option<Value>> {
        let mut payload = self.base_payload();
        payload.extend(fields);
        debug!(endpoint, payload = %redacted(&payload), "POST");

        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Http(format!("POST /{endpoint} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading /{endpoint} response: {e}")))?;

        let parsed: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(endpoint, %status, body = %body, "response is not the expected JSON envelope");
            Error::MalformedResponse(format!("POST /{endpoint} returned {status}: {e}"))
        })?;
        debug!(endpoint, %status, info = ?parsed.info, "response");

        if parsed.info.as_deref() != Some(INFO_OK) {
            return Err(Error::from_token(parsed.info.as_deref()));
        }
        Ok(parsed.data)
    }
}

/// Payload rendering for logs, with the verification code masked.
fn redacted(payload: &Map<String, Value>) -> Value {
    let mut shown = payload.clone();
    if shown.contains_key("code") {
        shown.insert("code".into(), json!("[REDACTED]"));
    }
    Value::Object(shown)
}
