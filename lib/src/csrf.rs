// Copyright (c) 2022-2023 The MobileCoin Foundation

//! CSRF token issue and verification
//!
//! Tokens are `base64url(payload) "." base64url(hmac_sha256(payload))`
//! where the payload is a JSON object carrying a random nonce and an
//! expiry timestamp in unix milliseconds. The HMAC key is generated per
//! process, so tokens do not survive a restart.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use hmac::{digest::generic_array::GenericArray, Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Request header carrying the CSRF token
pub const CSRF_HEADER_NAME: &str = "X-CSRF-Token";

/// Lifetime of an issued token
pub const CSRF_MAX_AGE: Duration = Duration::from_secs(30);

/// HMAC key length (the SHA-256 block size)
pub const CSRF_SECRET_LEN: usize = 64;

const CSRF_NONCE_LEN: usize = 64;

type HmacSha256 = Hmac<Sha256>;

/// CSRF token verification errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("invalid CSRF token")]
    InvalidFormat,
    #[error("invalid CSRF token signature")]
    InvalidSignature,
    #[error("CSRF token expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfToken {
    nonce: String,
    expires_at: u64,
}

/// CSRF token issuer / verifier
pub struct CsrfTokens {
    secret: Zeroizing<[u8; CSRF_SECRET_LEN]>,
    max_age: Duration,
}

impl CsrfTokens {
    /// Create a token issuer with a fresh random key
    pub fn new() -> Self {
        let mut secret = Zeroizing::new([0u8; CSRF_SECRET_LEN]);
        OsRng.fill_bytes(&mut secret[..]);

        Self {
            secret,
            max_age: CSRF_MAX_AGE,
        }
    }

    /// Create a token issuer with the provided key
    pub fn with_secret(secret: [u8; CSRF_SECRET_LEN]) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            max_age: CSRF_MAX_AGE,
        }
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new(GenericArray::from_slice(&self.secret[..]))
    }

    fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Issue a token valid until `CSRF_MAX_AGE` after now
    pub fn issue(&self) -> Result<String, serde_json::Error> {
        self.issue_at(SystemTime::now())
    }

    /// Issue a token valid until `CSRF_MAX_AGE` after `now`
    pub fn issue_at(&self, now: SystemTime) -> Result<String, serde_json::Error> {
        let mut nonce = Zeroizing::new([0u8; CSRF_NONCE_LEN]);
        OsRng.fill_bytes(&mut nonce[..]);

        let t = CsrfToken {
            nonce: STANDARD.encode(&nonce[..]),
            expires_at: unix_ms(now + self.max_age),
        };
        let payload = serde_json::to_vec(&t)?;

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            self.sign(&payload)
        ))
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<(), CsrfError> {
        self.verify_at(token, SystemTime::now())
    }

    /// Verify a token, checking format, then signature, then expiry at `now`
    pub fn verify_at(&self, token: &str, now: SystemTime) -> Result<(), CsrfError> {
        let mut parts = token.split('.');
        let (payload, sig) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(s), None) => (p, s),
            _ => return Err(CsrfError::InvalidFormat),
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CsrfError::InvalidFormat)?;

        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| CsrfError::InvalidSignature)?;

        self.mac()
            .chain_update(&payload)
            .verify_slice(&sig)
            .map_err(|_| CsrfError::InvalidSignature)?;

        let t: CsrfToken =
            serde_json::from_slice(&payload).map_err(|_| CsrfError::InvalidFormat)?;

        if unix_ms(now) >= t.expires_at {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }
}

impl Default for CsrfTokens {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_ms(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens() -> CsrfTokens {
        CsrfTokens::with_secret([0x5a; CSRF_SECRET_LEN])
    }

    #[test]
    fn issue_verify() {
        let c = tokens();
        let now = SystemTime::now();

        let t = c.issue_at(now).unwrap();
        assert_eq!(c.verify_at(&t, now), Ok(()));
        assert_eq!(
            c.verify_at(&t, now + CSRF_MAX_AGE - Duration::from_millis(1)),
            Ok(())
        );
    }

    #[test]
    fn expiry_boundary() {
        let c = tokens();
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        let t = c.issue_at(now).unwrap();
        assert_eq!(c.verify_at(&t, now + CSRF_MAX_AGE), Err(CsrfError::Expired));
        assert_eq!(
            c.verify_at(&t, now + CSRF_MAX_AGE * 2),
            Err(CsrfError::Expired)
        );
    }

    #[test]
    fn malformed_tokens() {
        let c = tokens();

        for t in ["", "abc", "a.b.c", "!!!.abc", "..", "@@.@@"] {
            assert_eq!(c.verify(t), Err(CsrfError::InvalidFormat), "token: {t:?}");
        }
    }

    #[test]
    fn tampered_tokens() {
        let c = tokens();
        let t = c.issue().unwrap();
        let (payload, sig) = t.split_once('.').unwrap();

        // Re-encoded payload with an extended expiry
        let mut decoded: CsrfToken =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        decoded.expires_at += 60_000;
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&decoded).unwrap());
        assert_eq!(
            c.verify(&format!("{forged}.{sig}")),
            Err(CsrfError::InvalidSignature)
        );

        // Modified signature
        let mut s = sig.to_string();
        let swap = if s.starts_with('A') { "B" } else { "A" };
        s.replace_range(0..1, swap);
        assert_eq!(
            c.verify(&format!("{payload}.{s}")),
            Err(CsrfError::InvalidSignature)
        );

        // Truncated or undecodable signature
        assert_eq!(
            c.verify(&format!("{payload}.{}", &sig[..8])),
            Err(CsrfError::InvalidSignature)
        );
        assert_eq!(
            c.verify(&format!("{payload}.!!{}", &sig[2..])),
            Err(CsrfError::InvalidSignature)
        );
        assert_eq!(
            c.verify(&format!("{payload}.")),
            Err(CsrfError::InvalidSignature)
        );

        // Signature from another key
        let other = CsrfTokens::with_secret([0xa5; CSRF_SECRET_LEN]);
        assert_eq!(other.verify(&t), Err(CsrfError::InvalidSignature));
    }

    #[test]
    fn tokens_are_unique() {
        let c = tokens();
        let now = SystemTime::now();

        assert_ne!(c.issue_at(now).unwrap(), c.issue_at(now).unwrap());
    }
}
