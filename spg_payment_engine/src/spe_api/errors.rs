use std::time::Duration;

use spg_common::MicroUsd;
use thiserror::Error;

use crate::traits::{AuthenticationError, LedgerError};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Event authentication failed. {0}")]
    Authentication(#[from] AuthenticationError),
    #[error("No active payment link matches reference '{0}'")]
    UnknownPaymentLink(String),
    #[error("No wallet exists for owner {0}")]
    UnknownWallet(String),
    #[error("Settlement amounts must be strictly positive, got {0}")]
    InvalidAmount(MicroUsd),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Settlement did not complete within {0:?}. The event source is expected to redeliver.")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum WithdrawalError {
    #[error("Withdrawals below {minimum} are not accepted (requested {requested})")]
    BelowMinimum { requested: MicroUsd, minimum: MicroUsd },
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
