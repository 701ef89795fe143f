//! Human-readable redemption report

use std::fmt::Write;

use afk_account::{RedemptionOutcome, UserCodes};

/// Render the outcome the way it is printed to stdout.
///
/// Successes are listed per user; already-used codes only when nothing was
/// redeemed. Expired and invalid codes follow.
pub fn render(outcome: &RedemptionOutcome) -> String {
    let mut out = String::new();
    if !outcome.success.is_empty() {
        out.push_str("These users have successfully redeemed codes:\n");
        push_users(&mut out, &outcome.success);
    } else if !outcome.used.is_empty() {
        out.push_str("These users have already redeemed these codes:\n");
        push_users(&mut out, &outcome.used);
    }
    if !outcome.expired.is_empty() {
        out.push_str("The following codes were expired:\n");
        let _ = writeln!(out, "  {}", outcome.expired.join(", "));
    }
    if !outcome.invalid.is_empty() {
        out.push_str("The following codes were invalid:\n");
        let _ = writeln!(out, "  {}", outcome.invalid.join(", "));
    }
    out
}

fn push_users(out: &mut String, entries: &[UserCodes]) {
    for entry in entries {
        let _ = writeln!(out, "  {}: {}", entry.user.name(), entry.codes.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afk_account::User;
    use afk_session::{SessionDir, SessionTransport, UserRecord};
    use common::ApiConfig;
    use std::sync::Arc;

    fn user(transport: &Arc<SessionTransport>, uid: u64, name: &str) -> User {
        User::from_record(
            UserRecord {
                uid,
                name: name.into(),
                svr_id: 1,
                level: 1,
                is_main: false,
            },
            transport,
        )
    }

    fn transport(dir: &tempfile::TempDir) -> Arc<SessionTransport> {
        let api = ApiConfig::default();
        Arc::new(SessionTransport::new(1, &api, SessionDir::new(dir.path())).unwrap())
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn empty_outcome_renders_nothing() {
        assert_eq!(render(&RedemptionOutcome::default()), "");
    }

    #[test]
    fn success_hides_used_section() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(&dir);
        let outcome = RedemptionOutcome {
            success: vec![UserCodes {
                user: user(&transport, 1, "Main"),
                codes: codes(&["A", "B"]),
            }],
            used: vec![UserCodes {
                user: user(&transport, 2, "Alt"),
                codes: codes(&["A"]),
            }],
            ..Default::default()
        };

        assert_eq!(
            render(&outcome),
            "These users have successfully redeemed codes:\n  Main: A, B\n"
        );
    }

    #[test]
    fn used_expired_and_invalid_sections() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport(&dir);
        let outcome = RedemptionOutcome {
            used: vec![UserCodes {
                user: user(&transport, 2, "Alt"),
                codes: codes(&["A"]),
            }],
            expired: codes(&["OLD"]),
            invalid: codes(&["BAD", "WORSE"]),
            ..Default::default()
        };

        assert_eq!(
            render(&outcome),
            "These users have already redeemed these codes:\n  Alt: A\n\
             The following codes were expired:\n  OLD\n\
             The following codes were invalid:\n  BAD, WORSE\n"
        );
    }
}
