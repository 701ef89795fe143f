//! The verified player account
//!
//! Owns the session transport exclusively. The linked users are replaced
//! wholesale on each fetch; `None` means no fetch has happened yet.
//!
//! `AuthExpired` from the users endpoint clears the authenticated flag before
//! the error is returned, so callers know to verify again.

use std::fmt;
use std::sync::Arc;

use afk_session::{Result, SessionDir, SessionTransport};
use common::ApiConfig;
use tracing::{debug, info, warn};

use crate::user::User;

pub struct Player {
    id: u64,
    transport: Arc<SessionTransport>,
    users: Option<Vec<User>>,
    main: Option<u64>,
    authenticated: bool,
}

impl Player {
    /// Create a player, resuming any session saved for `id` in `sessions`.
    pub fn new(id: u64, api: &ApiConfig, sessions: SessionDir) -> Result<Self> {
        Ok(Self::with_transport(SessionTransport::new(id, api, sessions)?))
    }

    fn with_transport(transport: SessionTransport) -> Self {
        Self {
            id: transport.uid(),
            transport: Arc::new(transport),
            users: None,
            main: None,
            authenticated: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Users from the most recent fetch, in server order.
    pub fn users(&self) -> Option<&[User]> {
        self.users.as_deref()
    }

    /// The user the server marked as the main account, if any.
    pub fn main(&self) -> Option<&User> {
        let main = self.main?;
        self.users.as_ref()?.iter().find(|u| u.id() == main)
    }

    /// Verify the session with the in-game verification code.
    pub async fn verify(&mut self, auth_code: u64) -> Result<&mut Self> {
        self.transport.verify(auth_code).await?;
        self.authenticated = true;
        info!(uid = self.id, "player verified");
        Ok(self)
    }

    /// Fetch all linked users, replacing any previously fetched set.
    pub async fn fetch_users(&mut self) -> Result<&[User]> {
        let records = match self.transport.list_users().await {
            Ok(records) => records,
            Err(e) => {
                if e.is_auth_expired() {
                    warn!(uid = self.id, "session expired");
                    self.authenticated = false;
                }
                return Err(e);
            }
        };

        let mut users: Vec<User> = Vec::with_capacity(records.len());
        let mut main = None;
        for record in records {
            let user = User::from_record(record, &self.transport);
            if user.is_main() {
                main = Some(user.id());
            }
            // A repeated id keeps its first position with the latest data
            match users.iter_mut().find(|u| u.id() == user.id()) {
                Some(existing) => *existing = user,
                None => users.push(user),
            }
        }

        info!(uid = self.id, users = users.len(), "fetched linked users");
        self.main = main;
        Ok(self.users.insert(users).as_slice())
    }

    /// Look up a linked user, fetching the list first if it never was.
    pub async fn get_user(&mut self, id: u64) -> Result<Option<&User>> {
        if self.users.is_none() {
            self.fetch_users().await?;
        }
        Ok(self.users.as_ref().and_then(|users| users.iter().find(|u| u.id() == id)))
    }

    /// `"UNVERIFIED"` before the first fetch, otherwise the linked user count.
    pub fn linked_summary(&self) -> String {
        match self.users.as_ref().map(Vec::len) {
            None => "UNVERIFIED".to_string(),
            Some(1) => "1 user".to_string(),
            Some(n) => format!("{n} users"),
        }
    }

    /// Release the transport. Users handed out earlier can no longer redeem.
    pub fn close(self) {
        match Arc::try_unwrap(self.transport) {
            Ok(transport) => transport.close(),
            Err(_) => debug!(uid = self.id, "transport still in use, released on last drop"),
        }
    }

    /// User whose name represents the player: the same-id account, else main.
    fn display_user(&self) -> Option<&User> {
        self.users
            .as_ref()?
            .iter()
            .find(|u| u.id() == self.id)
            .or_else(|| self.main())
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Player {} ({})>", self.id, self.linked_summary())
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_user() {
            Some(user) => write!(f, "{} ({})", user.name(), self.id),
            None => write!(f, "Unverified Player ({})", self.id),
        }
    }
}
