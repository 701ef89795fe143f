//! Gift code API constants
//!
//! The base URL is configurable (see `common::ApiConfig`); these are the fixed
//! parts of the protocol.

/// Game identifier sent with every request
pub const GAME: &str = "afk";

/// Success marker in the response `info` field
pub const INFO_OK: &str = "ok";

/// Submits the in-game verification code
pub const VERIFY_ENDPOINT: &str = "verify-afk-code";

/// Lists the in-game accounts linked to the player
pub const USERS_ENDPOINT: &str = "users";

/// Consumes a gift code for one in-game account
pub const CONSUME_ENDPOINT: &str = "cd-key/consume";

/// Redemption type expected by the consume endpoint
pub const CDKEY_TYPE: &str = "cdkey_web";

/// Extension of persisted session files
pub const SESSION_FILE_EXTENSION: &str = "session";
