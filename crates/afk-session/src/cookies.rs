//! Disk-persisted cookie store
//!
//! One JSON file per player (`<dir>/<uid>.session`) holds the cookies that keep
//! the API session authenticated across process restarts. The file exists
//! exactly while the player holds at least one unexpired cookie: every change
//! rewrites it, and it is deleted once the last cookie expires or is removed.
//!
//! The store plugs into reqwest through `CookieStore`, so the HTTP client
//! feeds every `Set-Cookie` through it. That trait cannot return errors, so
//! persistence failures from inside the client are logged and the in-memory
//! session keeps working.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Url;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::SESSION_FILE_EXTENSION;
use crate::error::{Error, Result};

/// Directory holding the persisted session files.
///
/// Passed explicitly to every store; there is no process-wide default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDir {
    path: PathBuf,
}

impl SessionDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Session file for a player.
    pub fn file_for(&self, uid: u64) -> PathBuf {
        self.path.join(format!("{uid}.{SESSION_FILE_EXTENSION}"))
    }

    /// Create the directory if it doesn't exist yet.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path).map_err(|e| {
            Error::Io(format!(
                "creating session dir {}: {e}",
                self.path.display()
            ))
        })
    }

    /// Delete every session file, leaving an empty directory behind.
    pub fn clear_all(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::Io(format!(
                    "removing session dir {}: {e}",
                    self.path.display()
                )));
            }
        }
        info!(path = %self.path.display(), "cleared all sessions");
        self.ensure()
    }
}

/// A single cookie as persisted on disk.
///
/// `expires` is a unix timestamp in seconds; `None` means a session cookie,
/// which is kept until the server replaces or removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "root_path")]
    pub path: String,
    /// Only sent over https
    #[serde(default)]
    pub secure: bool,
    /// Set when the server sent no Domain attribute: only the exact host matches
    #[serde(default)]
    pub host_only: bool,
    #[serde(default)]
    pub expires: Option<i64>,
}

fn root_path() -> String {
    "/".to_string()
}

impl StoredCookie {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// Whether this cookie belongs on a request to `url` (RFC 6265 5.4).
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.secure && url.scheme() != "https" {
            return false;
        }
        self.matches_host(host) && path_matches(&self.path, url.path())
    }

    fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if self.host_only {
            return host == self.domain;
        }
        host == self.domain || host.ends_with(&format!(".{}", self.domain))
    }

    /// Same cookie slot: a later cookie with this identity replaces the earlier.
    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    fn parse(header: &str, url: &Url, now: i64) -> Option<Self> {
        let host = url.host_str()?;
        let parsed = match cookie::Cookie::parse(header) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "ignoring unparseable Set-Cookie header");
                return None;
            }
        };

        // Max-Age wins over Expires
        let expires = match parsed.max_age() {
            Some(age) => Some(now.saturating_add(age.whole_seconds())),
            None => parsed.expires_datetime().map(|at| at.unix_timestamp()),
        };
        let (domain, host_only) = match parsed.domain() {
            Some(d) => (d.trim_start_matches('.').to_ascii_lowercase(), false),
            None => (host.to_ascii_lowercase(), true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url),
        };

        Some(Self {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            secure: parsed.secure().unwrap_or(false),
            host_only,
            expires,
        })
    }
}

/// Directory of the request path, used when Set-Cookie carries no Path.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        None | Some(0) => root_path(),
        Some(i) => path[..i].to_string(),
    }
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    match request_path.strip_prefix(cookie_path) {
        Some("") => true,
        Some(rest) => cookie_path.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// Cookie jar for one player that mirrors itself to that player's session file.
pub struct PersistentCookieStore {
    uid: u64,
    dir: SessionDir,
    cookies: Mutex<Vec<StoredCookie>>,
}

impl PersistentCookieStore {
    /// Open the store for a player, loading the session file if present.
    ///
    /// Cookies that expired while the process was not running are dropped on
    /// load; if none survive, the stale file is removed.
    pub fn open(uid: u64, dir: SessionDir) -> Result<Self> {
        let path = dir.file_for(uid);
        let loaded = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let cookies: Vec<StoredCookie> = serde_json::from_str(&contents)
                .map_err(|e| Error::SessionParse(format!("parsing session file: {e}")))?;
            info!(uid, path = %path.display(), cookies = cookies.len(), "loaded session");
            cookies
        } else {
            debug!(uid, path = %path.display(), "no saved session");
            Vec::new()
        };

        let store = Self {
            uid,
            dir,
            cookies: Mutex::new(loaded),
        };
        store.purge_expired_at(unix_now())?;
        Ok(store)
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Path of this player's session file.
    pub fn file_path(&self) -> PathBuf {
        self.dir.file_for(self.uid)
    }

    /// Snapshot of the current cookies.
    pub fn cookies(&self) -> Vec<StoredCookie> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Apply `Set-Cookie` header values received from `url` and persist.
    pub fn store_headers<'a>(
        &self,
        headers: impl IntoIterator<Item = &'a str>,
        url: &Url,
    ) -> Result<()> {
        let now = unix_now();
        let mut cookies = self.lock();
        let mut changed = false;
        for header in headers {
            let Some(cookie) = StoredCookie::parse(header, url, now) else {
                continue;
            };
            changed = true;
            debug!(uid = self.uid, name = %cookie.name, "cookie updated");
            match cookies.iter_mut().find(|c| c.same_slot(&cookie)) {
                Some(existing) => *existing = cookie,
                None => cookies.push(cookie),
            }
        }
        // Max-Age=0 and past Expires are how servers delete cookies
        let before = cookies.len();
        cookies.retain(|c| !c.is_expired(now));
        if !changed && cookies.len() == before {
            return Ok(());
        }
        self.persist(&cookies)
    }

    /// `Cookie` header value for a request to `url`, if any cookie matches.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        if let Err(e) = self.purge_expired_at(unix_now()) {
            warn!(uid = self.uid, error = %e, "failed to persist expired session");
        }
        let cookies = self.lock();
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|c| c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Drop cookies expired at `now` (unix seconds). Persists only on change.
    pub fn purge_expired_at(&self, now: i64) -> Result<()> {
        let mut cookies = self.lock();
        let before = cookies.len();
        cookies.retain(|c| !c.is_expired(now));
        if cookies.len() == before {
            return Ok(());
        }
        debug!(uid = self.uid, expired = before - cookies.len(), "cookies expired");
        self.persist(&cookies)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, cookies: &[StoredCookie]) -> Result<()> {
        let path = self.file_path();
        if cookies.is_empty() {
            return match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!(
                        uid = self.uid,
                        path = %path.display(),
                        "session ended, removed session file"
                    );
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing session file: {e}"))),
            };
        }
        self.dir.ensure()?;
        write_atomic(&path, cookies)
    }
}

impl CookieStore for PersistentCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers = cookie_headers.filter_map(|h| h.to_str().ok());
        if let Err(e) = self.store_headers(headers, url) {
            warn!(uid = self.uid, error = %e, "failed to persist session cookies");
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self.header_for(url)?;
        HeaderValue::from_str(&header).ok()
    }
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Write cookies to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 since the file grants access to
/// the player's account.
fn write_atomic(path: &Path, cookies: &[StoredCookie]) -> Result<()> {
    let json = serde_json::to_string_pretty(cookies)
        .map_err(|e| Error::SessionParse(format!("serializing cookies: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("session");
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, perms)
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), cookies = cookies.len(), "persisted session");
    Ok(())
}
