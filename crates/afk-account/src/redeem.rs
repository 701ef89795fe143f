//! Batch redemption across every linked user
//!
//! Users are walked in fetch order and, for each, the codes in the order
//! given. Calls are strictly sequential. Invalid and expired are properties
//! of the code, so once either is established no later user is sent that
//! code. Used and success are per user.
//!
//! Only the three code failures are recorded. Any other failure aborts the
//! batch and the outcome gathered so far is discarded.

use tracing::{debug, info};

use afk_session::{FailureKind, Result};

use crate::player::Player;
use crate::user::User;

/// Codes recorded against one user, in redemption order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCodes {
    pub user: User,
    pub codes: Vec<String>,
}

/// Result of `Player::redeem_codes`.
///
/// `invalid` and `expired` hold each code once no matter how many users
/// tried it. A (user, code) pair is in at most one of `used` / `success`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedemptionOutcome {
    pub invalid: Vec<String>,
    pub expired: Vec<String>,
    pub used: Vec<UserCodes>,
    pub success: Vec<UserCodes>,
}

impl RedemptionOutcome {
    /// Codes `uid` had already used before this batch.
    pub fn used_by(&self, uid: u64) -> Option<&[String]> {
        codes_for(&self.used, uid)
    }

    /// Codes `uid` redeemed in this batch.
    pub fn redeemed_by(&self, uid: u64) -> Option<&[String]> {
        codes_for(&self.success, uid)
    }

    /// Whether `code` is known to be invalid or expired for everyone.
    pub fn is_dead(&self, code: &str) -> bool {
        self.invalid.iter().any(|c| c == code) || self.expired.iter().any(|c| c == code)
    }

    pub fn is_empty(&self) -> bool {
        self.invalid.is_empty()
            && self.expired.is_empty()
            && self.used.is_empty()
            && self.success.is_empty()
    }

    fn record(&mut self, user: &User, code: &str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => push_for_user(&mut self.success, user, code),
            Err(e) => match e.kind() {
                Some(FailureKind::CodeInvalid) => push_unique(&mut self.invalid, code),
                Some(FailureKind::CodeExpired) => push_unique(&mut self.expired, code),
                Some(FailureKind::CodeUsed) => push_for_user(&mut self.used, user, code),
                _ => return Err(e),
            },
        }
        Ok(())
    }
}

fn codes_for(entries: &[UserCodes], uid: u64) -> Option<&[String]> {
    entries
        .iter()
        .find(|e| e.user.id() == uid)
        .map(|e| e.codes.as_slice())
}

fn push_unique(codes: &mut Vec<String>, code: &str) {
    if !codes.iter().any(|c| c == code) {
        codes.push(code.to_string());
    }
}

fn push_for_user(entries: &mut Vec<UserCodes>, user: &User, code: &str) {
    match entries.iter_mut().find(|e| e.user == *user) {
        Some(entry) => entry.codes.push(code.to_string()),
        None => entries.push(UserCodes {
            user: user.clone(),
            codes: vec![code.to_string()],
        }),
    }
}

impl Player {
    /// Redeem every code for every linked user.
    ///
    /// An unauthenticated player (e.g. one resuming a saved session) fetches
    /// its users first; `AuthExpired` from that fetch aborts the batch.
    pub async fn redeem_codes<S>(&mut self, codes: &[S]) -> Result<RedemptionOutcome>
    where
        S: AsRef<str>,
    {
        if !self.is_authenticated() || self.users().is_none() {
            self.fetch_users().await?;
        }

        let users = self.users().unwrap_or_default();
        info!(uid = self.id(), users = users.len(), codes = codes.len(), "redeeming codes");

        let mut outcome = RedemptionOutcome::default();
        for user in users {
            for code in codes.iter().map(AsRef::as_ref) {
                if outcome.is_dead(code) {
                    debug!(uid = user.id(), code, "skipping code known to be dead");
                    continue;
                }
                let result = user.redeem_code(code).await;
                outcome.record(user, code, result)?;
            }
        }

        info!(
            uid = self.id(),
            success = outcome.success.iter().map(|e| e.codes.len()).sum::<usize>(),
            used = outcome.used.iter().map(|e| e.codes.len()).sum::<usize>(),
            invalid = outcome.invalid.len(),
            expired = outcome.expired.len(),
            "redemption finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockApi;
    use crate::player::tests::{test_player, two_users};
    use serde_json::json;

    fn strings(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn success_and_used_split_per_user() {
        let api = MockApi::new()
            .users(two_users())
            .consume_error(2, "CODE1", "err_cdkey_batch_error");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(123456).await.unwrap();
        player.fetch_users().await.unwrap();

        let outcome = player.redeem_codes(&["CODE1"]).await.unwrap();

        assert_eq!(outcome.redeemed_by(1), Some(strings(&["CODE1"]).as_slice()));
        assert_eq!(outcome.used_by(2), Some(strings(&["CODE1"]).as_slice()));
        assert_eq!(outcome.redeemed_by(2), None);
        assert_eq!(outcome.used_by(1), None);
        assert!(outcome.invalid.is_empty());
        assert!(outcome.expired.is_empty());
    }

    #[tokio::test]
    async fn invalid_code_is_not_retried_for_later_users() {
        let api = MockApi::new()
            .users(two_users())
            .consume_error(1, "BAD", "err_cdkey_record_not_found");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();
        player.fetch_users().await.unwrap();

        let outcome = player.redeem_codes(&["BAD"]).await.unwrap();

        assert_eq!(outcome.invalid, strings(&["BAD"]));
        assert_eq!(api.consumed(), vec![(1, "BAD".to_string())]);
        assert!(outcome.success.is_empty());
    }

    #[tokio::test]
    async fn expired_code_is_recorded_once() {
        let api = MockApi::new()
            .users(two_users())
            .consume_error(1, "OLD", "err_cdkey_expired");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();
        player.fetch_users().await.unwrap();

        let outcome = player.redeem_codes(&["OLD", "NEW"]).await.unwrap();

        assert_eq!(outcome.expired, strings(&["OLD"]));
        assert_eq!(
            api.consumed(),
            vec![
                (1, "OLD".to_string()),
                (1, "NEW".to_string()),
                (2, "NEW".to_string()),
            ]
        );
        assert_eq!(outcome.redeemed_by(2), Some(strings(&["NEW"]).as_slice()));
    }

    #[tokio::test]
    async fn duplicate_invalid_code_in_request_listed_once() {
        let api = MockApi::new()
            .users(two_users())
            .consume_error(1, "BAD", "err_cdkey_record_not_found");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();
        player.fetch_users().await.unwrap();

        let outcome = player.redeem_codes(&["BAD", "BAD"]).await.unwrap();

        assert_eq!(outcome.invalid, strings(&["BAD"]));
        assert_eq!(api.consumed().len(), 1);
    }

    #[tokio::test]
    async fn calls_follow_user_then_code_order() {
        let api = MockApi::new().users(two_users());
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();
        player.fetch_users().await.unwrap();

        let outcome = player.redeem_codes(&["A", "B"]).await.unwrap();

        assert_eq!(
            api.consumed(),
            vec![
                (1, "A".to_string()),
                (1, "B".to_string()),
                (2, "A".to_string()),
                (2, "B".to_string()),
            ]
        );
        assert_eq!(outcome.redeemed_by(1), Some(strings(&["A", "B"]).as_slice()));
        assert_eq!(outcome.redeemed_by(2), Some(strings(&["A", "B"]).as_slice()));
    }

    #[tokio::test]
    async fn used_and_success_are_disjoint() {
        let api = MockApi::new()
            .users(two_users())
            .consume_error(1, "A", "err_cdkey_batch_error")
            .consume_error(2, "B", "err_cdkey_batch_error");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();
        player.fetch_users().await.unwrap();

        let outcome = player.redeem_codes(&["A", "B"]).await.unwrap();

        for uid in [1, 2] {
            let used = outcome.used_by(uid).unwrap_or_default();
            let redeemed = outcome.redeemed_by(uid).unwrap_or_default();
            assert!(
                used.iter().all(|c| !redeemed.contains(c)),
                "uid {uid}: used {used:?} overlaps redeemed {redeemed:?}"
            );
        }
        assert_eq!(outcome.used_by(1), Some(strings(&["A"]).as_slice()));
        assert_eq!(outcome.redeemed_by(1), Some(strings(&["B"]).as_slice()));
    }

    #[tokio::test]
    async fn used_code_stays_used_on_repeat_batch() {
        let api = MockApi::new()
            .users(json!([{"uid": 1, "name": "Solo", "svr_id": 1, "level": 1}]))
            .consume_error(1, "DONE", "err_cdkey_batch_error");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();
        player.fetch_users().await.unwrap();

        for _ in 0..2 {
            let outcome = player.redeem_codes(&["DONE"]).await.unwrap();
            assert_eq!(outcome.used_by(1), Some(strings(&["DONE"]).as_slice()));
            assert!(outcome.success.is_empty());
        }
        assert_eq!(api.consumed().len(), 2);
    }

    #[tokio::test]
    async fn unauthenticated_player_fetches_users_first() {
        let api = MockApi::new().users(two_users());
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;

        let outcome = player.redeem_codes(&["A"]).await.unwrap();

        assert_eq!(api.users_calls(), 1);
        assert_eq!(outcome.success.len(), 2);
    }

    #[tokio::test]
    async fn expired_session_aborts_batch() {
        let api = MockApi::new().users_error("err_login_state_out_of_date");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;

        let err = player.redeem_codes(&["A"]).await.unwrap_err();

        assert!(err.is_auth_expired());
        assert!(!player.is_authenticated());
        assert!(api.consumed().is_empty());
    }

    #[tokio::test]
    async fn non_code_failure_aborts_remaining_batch() {
        let api = MockApi::new()
            .users(two_users())
            .consume_error(1, "B", "err_login_state_out_of_date");
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();
        player.fetch_users().await.unwrap();

        let err = player.redeem_codes(&["A", "B", "C"]).await.unwrap_err();

        assert_eq!(err.kind(), Some(FailureKind::AuthExpired));
        assert_eq!(
            api.consumed(),
            vec![(1, "A".to_string()), (1, "B".to_string())]
        );
    }

    #[tokio::test]
    async fn no_users_means_no_calls() {
        let api = MockApi::new();
        let dir = tempfile::tempdir().unwrap();
        let mut player = test_player(&api, &dir, 1).await;
        player.verify(1).await.unwrap();

        let outcome = player.redeem_codes(&["A"]).await.unwrap();

        assert!(outcome.is_empty());
        assert!(api.consumed().is_empty());
    }

    #[test]
    fn push_unique_dedups() {
        let mut codes = Vec::new();
        push_unique(&mut codes, "X");
        push_unique(&mut codes, "Y");
        push_unique(&mut codes, "X");
        assert_eq!(codes, strings(&["X", "Y"]));
    }
}
