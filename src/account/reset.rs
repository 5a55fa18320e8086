//! Password-reset tokens. A token is `{timestamp}.{hmac}` where the HMAC
//! covers the user id, the current password hash, and the timestamp. Nothing
//! is persisted: verification recomputes the signature, and completing a
//! reset rotates the password hash, which invalidates every token still in
//! flight for that user.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::store::UserAccount;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResetTokenError {
    #[error("malformed or mismatched token")]
    Invalid,
    #[error("token issued outside the validity window")]
    Expired,
}

/// URL-safe encoding of the account id, as embedded in reset links.
pub fn encode_uid(user_id: i64) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

pub fn decode_uid(uid: &str) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(uid).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}

fn sign(secret: &str, user_id: i64, password_hash: &str, timestamp: i64) -> anyhow::Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("hmac key: {e}"))?;
    mac.update(user_id.to_string().as_bytes());
    mac.update(b":");
    mac.update(password_hash.as_bytes());
    mac.update(b":");
    mac.update(timestamp.to_string().as_bytes());
    Ok(mac)
}

/// Mint a token for the account at `issued_at`.
pub fn issue(secret: &str, account: &UserAccount, issued_at: OffsetDateTime) -> anyhow::Result<String> {
    let ts = issued_at.unix_timestamp();
    let mac = sign(secret, account.id, &account.password_hash, ts)?;
    Ok(format!("{}.{}", ts, hex::encode(mac.finalize().into_bytes())))
}

/// Recompute the signature against the account's current state and check the
/// issuance window. The signature comparison is constant-time.
pub fn verify(
    secret: &str,
    account: &UserAccount,
    token: &str,
    now: OffsetDateTime,
    max_age_minutes: i64,
) -> Result<(), ResetTokenError> {
    let (ts_part, sig_part) = token.split_once('.').ok_or(ResetTokenError::Invalid)?;
    let ts: i64 = ts_part.parse().map_err(|_| ResetTokenError::Invalid)?;
    let sig = hex::decode(sig_part).map_err(|_| ResetTokenError::Invalid)?;

    let mac = sign(secret, account.id, &account.password_hash, ts)
        .map_err(|_| ResetTokenError::Invalid)?;
    mac.verify_slice(&sig).map_err(|_| ResetTokenError::Invalid)?;

    let age = now.unix_timestamp() - ts;
    if age < 0 || age > max_age_minutes * 60 {
        return Err(ResetTokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    const SECRET: &str = "test-secret";

    fn account() -> UserAccount {
        UserAccount {
            id: 42,
            email: "a@x.com".into(),
            username: "alice".into(),
            password_hash: "$argon2id$fake".into(),
            avatar: None,
            is_active: true,
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn uid_roundtrip() {
        assert_eq!(decode_uid(&encode_uid(42)), Some(42));
        assert_eq!(decode_uid(&encode_uid(i64::MAX)), Some(i64::MAX));
    }

    #[test]
    fn uid_rejects_garbage() {
        assert_eq!(decode_uid("!!!"), None);
        assert_eq!(decode_uid(&URL_SAFE_NO_PAD.encode("not-a-number")), None);
    }

    #[test]
    fn fresh_token_verifies() {
        let account = account();
        let now = OffsetDateTime::now_utc();
        let token = issue(SECRET, &account, now).expect("issue");
        assert_eq!(verify(SECRET, &account, &token, now, 60), Ok(()));
    }

    #[test]
    fn token_expires_after_the_window() {
        let account = account();
        let now = OffsetDateTime::now_utc();
        let token = issue(SECRET, &account, now - Duration::minutes(61)).expect("issue");
        assert_eq!(
            verify(SECRET, &account, &token, now, 60),
            Err(ResetTokenError::Expired)
        );
    }

    #[test]
    fn token_from_the_future_is_rejected() {
        let account = account();
        let now = OffsetDateTime::now_utc();
        let token = issue(SECRET, &account, now + Duration::minutes(5)).expect("issue");
        assert_eq!(
            verify(SECRET, &account, &token, now, 60),
            Err(ResetTokenError::Expired)
        );
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let account = account();
        let now = OffsetDateTime::now_utc();
        let token = issue(SECRET, &account, now).expect("issue");
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('0') { '1' } else { '0' });
        assert_eq!(
            verify(SECRET, &account, &tampered, now, 60),
            Err(ResetTokenError::Invalid)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let account = account();
        let now = OffsetDateTime::now_utc();
        let token = issue(SECRET, &account, now).expect("issue");
        assert_eq!(
            verify("other-secret", &account, &token, now, 60),
            Err(ResetTokenError::Invalid)
        );
    }

    #[test]
    fn changing_the_password_hash_consumes_outstanding_tokens() {
        let mut account = account();
        let now = OffsetDateTime::now_utc();
        let token = issue(SECRET, &account, now).expect("issue");
        account.password_hash = "$argon2id$rotated".into();
        assert_eq!(
            verify(SECRET, &account, &token, now, 60),
            Err(ResetTokenError::Invalid)
        );
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        let account = account();
        let now = OffsetDateTime::now_utc();
        for bad in ["", "noseparator", "123.nothex", "abc.0011"] {
            assert_eq!(
                verify(SECRET, &account, bad, now, 60),
                Err(ResetTokenError::Invalid),
                "{bad:?}"
            );
        }
    }
}
