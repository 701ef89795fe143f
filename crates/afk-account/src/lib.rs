//! Player and linked-user model for the AFK Arena gift code API
//!
//! A `Player` is the externally verified account; it owns the session
//! transport and the `User`s (in-game accounts) linked to it. Batch
//! redemption walks every user and every code in order, skipping codes
//! already known to be invalid or expired.
//!
//! Typical flow:
//! 1. `Player::new()` resumes any saved session for the player id
//! 2. `Player::verify()` authenticates with the in-game verification code
//! 3. `Player::fetch_users()` discovers the linked accounts
//! 4. `Player::redeem_codes()` returns a `RedemptionOutcome`
//! 5. `Player::close()` releases the transport

pub mod player;
pub mod redeem;
pub mod user;

#[cfg(test)]
mod mock;

pub use afk_session::{Error, FailureKind, Result, SessionDir};
pub use player::Player;
pub use redeem::{RedemptionOutcome, UserCodes};
pub use user::User;
