use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default validity window for device-verification links: 15 minutes.
pub const DEVICE_TOKEN_MAX_AGE_SECS: i64 = 900;

/// Validity window for account email-confirmation links: 3 days.
pub const EMAIL_TOKEN_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 3;

/// Signs a value (a device fingerprint, or an email address for account
/// confirmation) together with an issue timestamp. The token is
/// self-contained; redeeming needs no stored state, only the shared secret.
///
/// Token layout: `{value}:{issued_ts}:{base64url(hmac_sha256)}`.
/// The MAC covers `{value}:{issued_ts}`, so neither part can be
/// altered without invalidating the signature.
pub struct DeviceTokenSigner {
    secret: Vec<u8>,
}

impl DeviceTokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    pub fn issue(&self, value: &str) -> String {
        self.issue_at(value, chrono::Utc::now().timestamp())
    }

    fn issue_at(&self, value: &str, issued_ts: i64) -> String {
        let payload = format!("{value}:{issued_ts}");
        let sig = self.sign(&payload);
        format!("{payload}:{}", URL_SAFE_NO_PAD.encode(sig))
    }

    /// Returns the signed value for a valid token, `None` otherwise. A bad
    /// signature, a malformed token and an expired one are indistinguishable
    /// to the caller.
    pub fn redeem(&self, token: &str, max_age_secs: i64) -> Option<String> {
        self.redeem_at(token, max_age_secs, chrono::Utc::now().timestamp())
    }

    fn redeem_at(&self, token: &str, max_age_secs: i64, now_ts: i64) -> Option<String> {
        // parse from the right: the signed value may itself contain ':'
        let (payload, sig_b64) = token.rsplit_once(':')?;
        let (value, ts_str) = payload.rsplit_once(':')?;
        let issued_ts: i64 = ts_str.parse().ok()?;

        let sig = URL_SAFE_NO_PAD.decode(sig_b64).ok()?;
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload.as_bytes());
        // constant-time comparison
        mac.verify_slice(&sig).ok()?;

        let elapsed = now_ts - issued_ts;
        // future-dated tokens are as invalid as expired ones;
        // expiry is inclusive: elapsed == max_age is already too late
        if elapsed < 0 || elapsed >= max_age_secs {
            return None;
        }
        Some(value.to_string())
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FP: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn signer() -> DeviceTokenSigner {
        DeviceTokenSigner::new("test-secret")
    }

    #[test]
    fn round_trip_within_window() {
        let s = signer();
        let token = s.issue_at(FP, 1_000_000);
        assert_eq!(
            s.redeem_at(&token, DEVICE_TOKEN_MAX_AGE_SECS, 1_000_500)
                .as_deref(),
            Some(FP)
        );
    }

    #[test]
    fn expired_exactly_at_max_age() {
        let s = signer();
        let token = s.issue_at(FP, 1_000_000);
        // one second before the boundary: still valid
        assert!(s
            .redeem_at(&token, DEVICE_TOKEN_MAX_AGE_SECS, 1_000_899)
            .is_some());
        // at issue + 900s the token is expired
        assert!(s
            .redeem_at(&token, DEVICE_TOKEN_MAX_AGE_SECS, 1_000_900)
            .is_none());
        assert!(s
            .redeem_at(&token, DEVICE_TOKEN_MAX_AGE_SECS, 1_001_000)
            .is_none());
    }

    #[test]
    fn tampered_signature_rejected() {
        let s = signer();
        let token = s.issue_at(FP, 1_000_000);
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert!(s
            .redeem_at(&tampered, DEVICE_TOKEN_MAX_AGE_SECS, 1_000_100)
            .is_none());
    }

    #[test]
    fn tampered_timestamp_rejected() {
        let s = signer();
        let token = s.issue_at(FP, 1_000_000);
        // push the embedded timestamp forward without re-signing
        let forged = token.replacen("1000000", "2000000", 1);
        assert!(s
            .redeem_at(&forged, DEVICE_TOKEN_MAX_AGE_SECS, 2_000_100)
            .is_none());
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = signer().issue_at(FP, 1_000_000);
        let other = DeviceTokenSigner::new("another-secret");
        assert!(other
            .redeem_at(&token, DEVICE_TOKEN_MAX_AGE_SECS, 1_000_100)
            .is_none());
    }

    #[test]
    fn malformed_and_future_tokens_rejected() {
        let s = signer();
        assert!(s.redeem_at("", DEVICE_TOKEN_MAX_AGE_SECS, 0).is_none());
        assert!(s
            .redeem_at("not-a-token", DEVICE_TOKEN_MAX_AGE_SECS, 0)
            .is_none());
        assert!(s
            .redeem_at("a:b:c", DEVICE_TOKEN_MAX_AGE_SECS, 0)
            .is_none());

        let future = s.issue_at(FP, 2_000_000);
        assert!(s
            .redeem_at(&future, DEVICE_TOKEN_MAX_AGE_SECS, 1_000_000)
            .is_none());
    }
}
