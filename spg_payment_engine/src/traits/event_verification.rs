use thiserror::Error;

use crate::processor_types::SettlementEvent;

#[derive(Debug, Clone, Error)]
pub enum AuthenticationError {
    #[error("No signature was attached to the webhook payload")]
    MissingSignature,
    #[error("The webhook signature does not match the payload")]
    InvalidSignature,
    #[error("The webhook payload could not be parsed: {0}")]
    MalformedPayload(String),
    #[error("The verifier is misconfigured: {0}")]
    VerifierMisconfigured(String),
}

/// Authenticates a raw payment-processor webhook delivery and yields the settlement event it carries.
///
/// The settlement flow only ever sees events that came through a verifier, so swapping in a
/// test double lets the whole flow be exercised without real cryptographic material. The default
/// production implementation is [`crate::helpers::HmacVerifier`].
pub trait WebhookVerifier {
    /// Verifies the payload against the attached signature and parses the event out of it.
    fn verify(&self, payload: &[u8], signature: Option<&str>) -> Result<SettlementEvent, AuthenticationError>;
}
