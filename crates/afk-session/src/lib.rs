//! Authenticated session for the AFK Arena gift code API
//!
//! Provides the failure taxonomy for server error tokens, a cookie store that
//! persists itself to disk per player, and the transport that issues the three
//! API calls. This crate knows nothing about players or users beyond their
//! numeric identifiers.
//!
//! Session flow:
//! 1. `SessionTransport::new()` loads `<dir>/<uid>.session` if present
//! 2. `verify()` submits the in-game verification code; the server sets cookies
//! 3. Every cookie change is written back to the session file
//! 4. `list_users()` / `redeem_code()` ride on those cookies
//! 5. When every cookie has expired the session file is deleted

pub mod constants;
pub mod cookies;
pub mod error;
pub mod transport;

pub use constants::*;
pub use cookies::{PersistentCookieStore, SessionDir, StoredCookie};
pub use error::{Error, FailureKind, Result};
pub use transport::{SessionTransport, UserRecord};
