//! # Webhook signature verification
//!
//! The payment processor signs every webhook delivery with a shared secret: the signature is a keyed
//! BLAKE2b MAC over the raw request body, sent hex-encoded in a header. Settlement only accepts events
//! that pass this check, so a forged or corrupted delivery never reaches the ledger.
//!
//! [`HmacVerifier`] is the production implementation of [`WebhookVerifier`]. The checks can be
//! disabled for local development; a verifier constructed from configuration will log loudly if so.

use blake2::{
    digest::{FixedOutput, KeyInit, Mac},
    Blake2bMac512,
};
use log::{trace, warn};
use spg_common::Secret;

use crate::{
    processor_types::{RawSettlementEvent, SettlementEvent},
    traits::{AuthenticationError, WebhookVerifier},
};

/// Computes the hex-encoded keyed BLAKE2b-512 MAC of `data`.
///
/// The key must be at most 64 bytes, a limit of the BLAKE2b keying scheme.
pub fn calculate_webhook_hmac(secret: &str, data: &[u8]) -> Result<String, AuthenticationError> {
    let mut mac = new_mac(secret)?;
    Mac::update(&mut mac, data);
    let tag = mac.finalize_fixed();
    Ok(to_hex(&tag))
}

/// Checks a claimed hex signature against the payload. The comparison happens on the raw MAC bytes in
/// constant time.
pub fn verify_webhook_hmac(secret: &str, data: &[u8], signature: &str) -> Result<(), AuthenticationError> {
    let claimed = from_hex(signature).ok_or(AuthenticationError::InvalidSignature)?;
    let mut mac = new_mac(secret)?;
    Mac::update(&mut mac, data);
    mac.verify_slice(&claimed).map_err(|_| AuthenticationError::InvalidSignature)
}

fn new_mac(secret: &str) -> Result<Blake2bMac512, AuthenticationError> {
    <Blake2bMac512 as KeyInit>::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthenticationError::VerifierMisconfigured(format!("Invalid webhook secret length. {e}")))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}

/// Verifies processor webhook deliveries with a shared-secret BLAKE2b MAC, then parses the settlement
/// event out of the payload.
#[derive(Clone)]
pub struct HmacVerifier {
    secret: Secret<String>,
    // If false, signature checks are skipped and any well-formed payload is accepted
    enabled: bool,
}

impl HmacVerifier {
    pub fn new(secret: Secret<String>, enabled: bool) -> Self {
        if !enabled {
            warn!(
                "🔐️ Webhook signature checks are DISABLED. Any well-formed payload will be accepted as \
                 authentic. Do not run production like this."
            );
        }
        Self { secret, enabled }
    }
}

impl WebhookVerifier for HmacVerifier {
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<SettlementEvent, AuthenticationError> {
        if self.enabled {
            let signature = signature.ok_or(AuthenticationError::MissingSignature)?;
            verify_webhook_hmac(self.secret.reveal(), payload, signature)?;
            trace!("🔐️ Webhook signature check ✅️");
        } else {
            trace!("🔐️ Webhook signature checks are disabled. Accepting payload.");
        }
        let raw = serde_json::from_slice::<RawSettlementEvent>(payload)
            .map_err(|e| AuthenticationError::MalformedPayload(e.to_string()))?;
        SettlementEvent::try_from(raw).map_err(|e| AuthenticationError::MalformedPayload(e.to_string()))
    }
}
