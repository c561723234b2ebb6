//! Stripe webhook signature verification
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The MAC is HMAC-SHA256 over `"<t>." ++ raw body`, keyed with the endpoint
//! signing secret. Several `v1` entries appear while a secret is being rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature on inbound deliveries
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Allowed skew between the signed timestamp and now (5 minutes)
const TOLERANCE_SECS: u64 = 300;

/// Parsed components of the signature header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| invalid("malformed header"))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| invalid("malformed timestamp"))?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| invalid("malformed v1"))?);
                }
                // v0 and future schemes
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
        if v1_signatures.is_empty() {
            return Err(invalid("missing v1 signature"));
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifies deliveries against the shared signing secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: TOLERANCE_SECS,
        }
    }

    /// Verify `payload` against `header` at the current time
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify `payload` against `header` as of `now` (unix seconds)
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
        let header = SignatureHeader::parse(header)?;

        if now.abs_diff(header.timestamp) > self.tolerance_secs {
            return Err(invalid("timestamp outside tolerance"));
        }

        let matched = header.v1_signatures.iter().any(|candidate| {
            mac_for(&self.secret, header.timestamp, payload).verify_slice(candidate).is_ok()
        });

        if matched {
            Ok(())
        } else {
            Err(invalid("no matching v1 signature"))
        }
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Build a signature header value for `payload`
///
/// Used to replay deliveries locally and in tests.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let digest = mac_for(secret, timestamp, payload).finalize().into_bytes();
    format!("t={timestamp},v1={}", hex::encode(digest))
}

fn invalid(reason: &str) -> PaymentError {
    PaymentError::SignatureInvalid(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_704_067_200;
    const BODY: &[u8] = br#"{"id":"evt_1","type":"invoice.payment_succeeded","created":1704067200,"data":{"object":{"subscription":"sub_1"}}}"#;

    #[test]
    fn test_valid_signature_verifies() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = sign_payload(SECRET, NOW, BODY);
        assert!(verifier.verify_at(BODY, &header, NOW).is_ok());
    }

    #[test]
    fn test_any_body_byte_mutation_fails() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = sign_payload(SECRET, NOW, BODY);

        for i in 0..BODY.len() {
            let mut tampered = BODY.to_vec();
            tampered[i] ^= 0x01;
            assert!(
                verifier.verify_at(&tampered, &header, NOW).is_err(),
                "mutation at byte {i} verified"
            );
        }
    }

    #[test]
    fn test_any_header_byte_mutation_fails() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = sign_payload(SECRET, NOW, BODY);

        for i in 0..header.len() {
            let mut tampered = header.clone().into_bytes();
            tampered[i] ^= 0x01;
            let Ok(tampered) = String::from_utf8(tampered) else {
                continue;
            };
            assert!(
                verifier.verify_at(BODY, &tampered, NOW).is_err(),
                "header mutation at byte {i} verified: {tampered}"
            );
        }
    }

    #[test]
    fn test_wrong_secret_fails() {
        let verifier = WebhookVerifier::new("whsec_other");
        let header = sign_payload(SECRET, NOW, BODY);
        assert!(matches!(
            verifier.verify_at(BODY, &header, NOW),
            Err(PaymentError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_stale_and_future_timestamps_fail() {
        let verifier = WebhookVerifier::new(SECRET);
        let header = sign_payload(SECRET, NOW, BODY);
        assert!(verifier.verify_at(BODY, &header, NOW + 300).is_ok());
        assert!(verifier.verify_at(BODY, &header, NOW + 301).is_err());
        assert!(verifier.verify_at(BODY, &header, NOW - 301).is_err());
    }

    #[test]
    fn test_extreme_timestamps_are_out_of_tolerance() {
        let verifier = WebhookVerifier::new(SECRET);
        for ts in [i64::MIN, i64::MAX] {
            let header = sign_payload(SECRET, ts, BODY);
            assert!(matches!(
                verifier.verify_at(BODY, &header, NOW),
                Err(PaymentError::SignatureInvalid(_))
            ));
        }

        let forged = format!("t={},v1=00", i64::MIN);
        assert!(verifier.verify_at(BODY, &forged, NOW).is_err());
        assert!(verifier.verify_at(BODY, &sign_payload(SECRET, NOW, BODY), i64::MIN).is_err());
    }

    #[test]
    fn test_rolled_secret_second_signature_matches() {
        let verifier = WebhookVerifier::new(SECRET);
        let old = sign_payload("whsec_old", NOW, BODY);
        let new = sign_payload(SECRET, NOW, BODY);
        let old_v1 = old.split_once(",v1=").unwrap().1;
        let new_v1 = new.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1={old_v1},v1={new_v1},v0=deadbeef");
        assert!(verifier.verify_at(BODY, &header, NOW).is_ok());
    }

    #[test]
    fn test_malformed_headers_fail() {
        for header in ["", "t=abc,v1=00", "v1=00", "t=1704067200", "t=1704067200,v1=zz", "garbage"] {
            assert!(
                SignatureHeader::parse(header).is_err(),
                "accepted malformed header {header:?}"
            );
        }
    }
}
