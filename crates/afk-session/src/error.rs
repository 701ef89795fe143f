//! Error types for session operations
//!
//! The API answers every call with `{info, data?}`. Any `info` other than
//! `"ok"` is an opaque token; `FailureKind::classify` maps the known tokens to
//! typed kinds and everything else to `FailureKind::Request`.

use std::fmt;

/// Classified category of a server rejection.
///
/// Hierarchy: every kind is a request failure; `CodeUsed`, `CodeExpired` and
/// `CodeInvalid` are additionally code failures (see `is_code_error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Unrecognized or missing token
    Request,
    /// The player id was not sent as a number
    UidType,
    /// The verification code was not sent as a string
    AuthType,
    /// The session is no longer authenticated
    AuthExpired,
    /// Wrong verification code
    AuthFailed,
    /// The user already redeemed this code
    CodeUsed,
    /// The code can no longer be redeemed
    CodeExpired,
    /// No such code
    CodeInvalid,
}

/// Server token for each recognized kind.
const TOKENS: &[(&str, FailureKind)] = &[
    ("err_uid_must_be_number", FailureKind::UidType),
    ("err_code_must_be_valid_string", FailureKind::AuthType),
    ("err_login_state_out_of_date", FailureKind::AuthExpired),
    ("err_wrong_code", FailureKind::AuthFailed),
    ("err_cdkey_batch_error", FailureKind::CodeUsed),
    ("err_cdkey_expired", FailureKind::CodeExpired),
    ("err_cdkey_record_not_found", FailureKind::CodeInvalid),
];

impl FailureKind {
    /// Map a server error token to its kind. Pure lookup.
    pub fn classify(token: Option<&str>) -> Self {
        token
            .and_then(|t| TOKENS.iter().find(|(known, _)| *known == t))
            .map(|(_, kind)| *kind)
            .unwrap_or(FailureKind::Request)
    }

    /// The server token for this kind, `None` for the generic kind.
    pub fn token(&self) -> Option<&'static str> {
        TOKENS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(token, _)| *token)
    }

    pub fn is_code_error(&self) -> bool {
        matches!(
            self,
            FailureKind::CodeUsed | FailureKind::CodeExpired | FailureKind::CodeInvalid
        )
    }

    /// Name shown to users when a request fails.
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::Request => "RequestError",
            FailureKind::UidType => "UIDTypeError",
            FailureKind::AuthType => "AuthTypeError",
            FailureKind::AuthExpired => "AuthExpired",
            FailureKind::AuthFailed => "AuthFailed",
            FailureKind::CodeUsed => "CodeUsed",
            FailureKind::CodeExpired => "CodeExpired",
            FailureKind::CodeInvalid => "CodeInvalid",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request rejected ({kind}): {}", .token.as_deref().unwrap_or("<no info>"))]
    Request {
        kind: FailureKind,
        token: Option<String>,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("session file parse error: {0}")]
    SessionParse(String),

    #[error("session closed: {0}")]
    SessionClosed(String),
}

impl Error {
    /// Build a classified rejection from the response `info` token.
    pub fn from_token(token: Option<&str>) -> Self {
        Error::Request {
            kind: FailureKind::classify(token),
            token: token.map(str::to_owned),
        }
    }

    /// Failure kind for classified rejections, `None` for transport failures.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Error::Request { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        self.kind() == Some(FailureKind::AuthExpired)
    }

    pub fn is_code_error(&self) -> bool {
        self.kind().is_some_and(|k| k.is_code_error())
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
