//! In-game account linked to a player

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use afk_session::{Error, Result, SessionTransport, UserRecord};
use tracing::debug;

/// One in-game account. Immutable once built from server data.
///
/// Holds a non-owning handle to its player's transport; redeeming after the
/// player was closed fails with `Error::SessionClosed`.
#[derive(Clone)]
pub struct User {
    id: u64,
    name: String,
    server_id: u64,
    level: u32,
    is_main: bool,
    player_id: u64,
    transport: Weak<SessionTransport>,
}

impl User {
    /// Build a user from a server record, linked to `transport`'s player.
    pub fn from_record(record: UserRecord, transport: &Arc<SessionTransport>) -> Self {
        Self {
            id: record.uid,
            name: record.name,
            server_id: record.svr_id,
            level: record.level,
            is_main: record.is_main,
            player_id: transport.uid(),
            transport: Arc::downgrade(transport),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_id(&self) -> u64 {
        self.server_id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_main(&self) -> bool {
        self.is_main
    }

    /// Id of the player this account is linked to.
    pub fn player_id(&self) -> u64 {
        self.player_id
    }

    /// Redeem a gift code for this account through the player's session.
    pub async fn redeem_code(&self, code: &str) -> Result<()> {
        let transport = self.transport.upgrade().ok_or_else(|| {
            Error::SessionClosed(format!("player {} was closed", self.player_id))
        })?;
        debug!(uid = self.id, code, "redeeming code");
        transport.redeem_code(code, Some(self.id)).await
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("server_id", &self.server_id)
            .field("level", &self.level)
            .field("is_main", &self.is_main)
            .field("player_id", &self.player_id)
            .finish()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.player_id == other.player_id && self.id == other.id
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.player_id.hash(state);
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afk_session::SessionDir;
    use common::ApiConfig;

    fn transport(dir: &tempfile::TempDir) -> Arc<SessionTransport> {
        let api = ApiConfig {
            base_url: "http://127.0.0.1:9/".into(),
            timeout_secs: 1,
        };
        Arc::new(SessionTransport::new(42, &api, SessionDir::new(dir.path())).unwrap())
    }

    fn record() -> UserRecord {
        UserRecord {
            uid: 7,
            name: "Hero".into(),
            svr_id: 300,
            level: 120,
            is_main: true,
        }
    }

    #[test]
    fn from_record_copies_fields() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(&dir);
        let user = User::from_record(record(), &transport);

        assert_eq!(user.id(), 7);
        assert_eq!(user.name(), "Hero");
        assert_eq!(user.server_id(), 300);
        assert_eq!(user.level(), 120);
        assert!(user.is_main());
        assert_eq!(user.player_id(), 42);
    }

    #[test]
    fn display_shows_name_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let user = User::from_record(record(), &transport(&dir));
        assert_eq!(user.to_string(), "Hero (7)");
    }

    #[test]
    fn equality_ignores_mutable_server_fields() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(&dir);
        let a = User::from_record(record(), &transport);
        let mut leveled = record();
        leveled.level = 121;
        let b = User::from_record(leveled, &transport);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn redeem_after_transport_dropped_is_session_closed() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(&dir);
        let user = User::from_record(record(), &transport);
        drop(transport);

        let err = user.redeem_code("GIFT").await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)), "got: {err:?}");
    }
}
