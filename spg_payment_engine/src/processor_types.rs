//! Wire types for inbound payment-processor webhook events.
//!
//! The processor posts JSON with camelCase keys and decimal-dollar amounts. Amounts are re-parsed from
//! the JSON number's text through [`MicroUsd`]'s decimal parser so no floating-point value ever becomes
//! a balance.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use spg_common::MicroUsd;
use thiserror::Error;

use crate::db_types::OrderId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventStatus {
    #[default]
    #[serde(alias = "ORDER_COMPLETED")]
    Completed,
    #[serde(alias = "ORDER_FAILED")]
    Failed,
    #[serde(alias = "ORDER_REFUNDED")]
    Refunded,
}

impl Display for OrderEventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventStatus::Completed => write!(f, "COMPLETED"),
            OrderEventStatus::Failed => write!(f, "FAILED"),
            OrderEventStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// An authenticated payment-processor event, as handed to the settlement flow by a
/// [`crate::traits::WebhookVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEvent {
    /// The processor's order id. The idempotency key: one order settles at most once.
    pub order_id: OrderId,
    /// The address the funds were sent to. Settlement ignores events for any address other than the
    /// platform's custody address.
    pub target_address: String,
    /// The payment-link code embedded in the transaction, used to resolve the receiving vendor.
    pub link_code: String,
    /// The gross settled amount.
    pub amount: MicroUsd,
    pub status: OrderEventStatus,
}

impl SettlementEvent {
    pub fn completed<O, T, L>(order_id: O, target_address: T, link_code: L, amount: MicroUsd) -> Self
    where
        O: Into<OrderId>,
        T: Into<String>,
        L: Into<String>,
    {
        Self {
            order_id: order_id.into(),
            target_address: target_address.into(),
            link_code: link_code.into(),
            amount,
            status: OrderEventStatus::Completed,
        }
    }
}

/// The raw wire shape of a processor event, before amount normalisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettlementEvent {
    pub external_order_id: String,
    pub target_address: String,
    pub link_reference: String,
    pub amount: serde_json::Number,
    #[serde(default)]
    pub status: OrderEventStatus,
}

#[derive(Debug, Clone, Error)]
#[error("Could not convert processor event into a settlement event. {0}")]
pub struct EventConversionError(pub String);

impl TryFrom<RawSettlementEvent> for SettlementEvent {
    type Error = EventConversionError;

    fn try_from(raw: RawSettlementEvent) -> Result<Self, Self::Error> {
        let amount = raw
            .amount
            .to_string()
            .parse::<MicroUsd>()
            .map_err(|e| EventConversionError(format!("Invalid amount in event {}: {e}", raw.external_order_id)))?;
        Ok(Self {
            order_id: OrderId::from(raw.external_order_id),
            target_address: raw.target_address,
            link_code: raw.link_reference,
            amount,
            status: raw.status,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_processor_payload() {
        let json = r#"{
            "externalOrderId": "ord_1",
            "targetAddress": "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B",
            "linkReference": "lnk_9f2c",
            "amount": 500.00
        }"#;
        let raw: RawSettlementEvent = serde_json::from_str(json).expect("payload should parse");
        let event = SettlementEvent::try_from(raw).expect("amount should convert");
        assert_eq!(event.order_id, OrderId::from("ord_1"));
        assert_eq!(event.amount, MicroUsd::from(500_000_000));
        assert_eq!(event.status, OrderEventStatus::Completed);
    }

    #[test]
    fn parse_refund_status() {
        let json = r#"{
            "externalOrderId": "ord_2",
            "targetAddress": "0xdeadbeef",
            "linkReference": "lnk_1",
            "amount": 12,
            "status": "ORDER_REFUNDED"
        }"#;
        let raw: RawSettlementEvent = serde_json::from_str(json).expect("payload should parse");
        assert_eq!(raw.status, OrderEventStatus::Refunded);
    }
}
