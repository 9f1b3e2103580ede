use serde::{Deserialize, Serialize};

use crate::db_types::Payment;

/// The result of feeding one processor event through the settlement flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// The payment was recorded and the net amount credited to the vendor's wallet.
    Settled { payment: Payment, entry_id: i64 },
    /// The order id had already settled. Redelivery is a successful no-op, never an error.
    AlreadySettled(Payment),
    /// The event targeted an address other than the platform custody address. It was ignored without
    /// any side effect; this filters unrelated transactions and is not a failure.
    Ignored,
    /// A failed/refunded notice for an order that was never credited. Nothing to do.
    NoEffect,
    /// A failed/refunded notice for an order that had already been credited. The credit must be
    /// reversed with an operator-recorded compensating adjustment; the engine never does this
    /// automatically.
    ManualReversalRequired(Payment),
}

impl SettlementOutcome {
    /// The payment this outcome refers to, where one exists.
    pub fn payment(&self) -> Option<&Payment> {
        match self {
            SettlementOutcome::Settled { payment, .. } |
            SettlementOutcome::AlreadySettled(payment) |
            SettlementOutcome::ManualReversalRequired(payment) => Some(payment),
            SettlementOutcome::Ignored | SettlementOutcome::NoEffect => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, SettlementOutcome::Settled { .. })
    }
}
