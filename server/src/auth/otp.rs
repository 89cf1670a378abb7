//! One-Time Passcodes
//!
//! Six-digit numeric codes with a ten-minute expiry. One active code per
//! user; a new request supersedes the previous code and a successful
//! verification clears it.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::db::User;

/// Code validity window.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Generate a uniformly random six-digit code.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Expiry for a code issued now.
pub fn expiry_from_now() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(OTP_TTL_MINUTES)
}

/// Whether the submitted code matches the user's active OTP at `now`.
///
/// False when no code is pending, the code differs, or the window passed.
#[must_use]
pub fn code_matches(user: &User, submitted: &str, now: DateTime<Utc>) -> bool {
    match (&user.otp_value, user.otp_expires_at) {
        (Some(value), Some(expires_at)) => value == submitted && now <= expires_at,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user_with_otp(value: Option<&str>, expires_at: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::now_v7(),
            email: "demo@example.com".to_string(),
            username: "demo".to_string(),
            password_hash: None,
            otp_value: value.map(ToString::to_string),
            otp_expires_at: expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn matching_code_within_window() {
        let now = Utc::now();
        let user = user_with_otp(Some("123456"), Some(now + Duration::minutes(5)));
        assert!(code_matches(&user, "123456", now));
    }

    #[test]
    fn wrong_code_fails() {
        let now = Utc::now();
        let user = user_with_otp(Some("123456"), Some(now + Duration::minutes(5)));
        assert!(!code_matches(&user, "654321", now));
    }

    #[test]
    fn expired_code_fails() {
        let now = Utc::now();
        let user = user_with_otp(Some("123456"), Some(now - Duration::seconds(1)));
        assert!(!code_matches(&user, "123456", now));
    }

    #[test]
    fn absent_code_fails() {
        let now = Utc::now();
        assert!(!code_matches(&user_with_otp(None, None), "123456", now));
        // A value without an expiry is treated as unusable, not eternal.
        let half_set = user_with_otp(Some("123456"), None);
        assert!(!code_matches(&half_set, "123456", now));
    }
}
