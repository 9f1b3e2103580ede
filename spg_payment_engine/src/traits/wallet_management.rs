use spg_common::MicroUsd;
use thiserror::Error;

use crate::db_types::{LedgerEntry, OrderId, Payment, ReviewTier, Wallet, WithdrawalRequest};

#[derive(Debug, Clone, Error)]
pub enum WalletQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No wallet exists for owner {0}")]
    UnknownOwner(String),
}

impl From<sqlx::Error> for WalletQueryError {
    fn from(e: sqlx::Error) -> Self {
        WalletQueryError::DatabaseError(e.to_string())
    }
}

/// The `WalletManagement` trait defines the read-only queries collaborators consume.
///
/// [`crate::traits::LedgerDatabase`] handles the machinery of moving money; `WalletManagement`
/// answers questions about the resulting state: dashboard balances, ledger statements for audit, and
/// the pending-withdrawal queue the admin review UI works through.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Returns the current balance for the given owner's wallet.
    async fn balance_for_owner(&self, owner_id: &str) -> Result<MicroUsd, WalletQueryError>;

    /// Returns the wallet record for the given owner, if one exists.
    async fn wallet_for_owner(&self, owner_id: &str) -> Result<Option<Wallet>, WalletQueryError>;

    /// Returns every ledger entry for the wallet, oldest first. This is the statement/audit view; the
    /// sum of the returned amounts is, by invariant, the wallet's balance.
    async fn ledger_entries_for_wallet(&self, wallet_id: i64) -> Result<Vec<LedgerEntry>, WalletQueryError>;

    /// Returns pending withdrawal requests, oldest first, optionally narrowed to one review tier
    /// (e.g. only `Manual` for the enhanced-review queue).
    async fn pending_withdrawals(&self, tier: Option<ReviewTier>) -> Result<Vec<WithdrawalRequest>, WalletQueryError>;

    /// Fetches a withdrawal request by id, or `None` if it does not exist.
    async fn withdrawal_by_id(&self, request_id: i64) -> Result<Option<WithdrawalRequest>, WalletQueryError>;

    /// Returns the settled payments received by the given owner, newest first.
    async fn payments_for_owner(&self, owner_id: &str) -> Result<Vec<Payment>, WalletQueryError>;

    /// Fetches the payment for the given external order id, if the order has settled.
    async fn payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, WalletQueryError>;
}
