use spg_common::MicroUsd;
use thiserror::Error;

use crate::db_types::{
    Actor,
    NewLedgerEntry,
    NewPayment,
    NewPaymentLink,
    NewWithdrawalRequest,
    OrderId,
    Payment,
    PaymentLink,
    Wallet,
    WithdrawalDecision,
    WithdrawalRequest,
};

/// This trait defines the transactional behaviour for backends supporting the payment engine.
///
/// Every method that moves money executes its ledger-entry insert and balance update inside a single
/// database transaction, serialized per wallet by the store. Different wallets may be mutated fully in
/// parallel; there is no global lock and no shared mutable state in process memory.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + crate::traits::WalletManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates the wallet for a new account holder, with a zero balance.
    ///
    /// Fails with [`LedgerError::WalletAlreadyExists`] if the owner already has one; a wallet is
    /// created exactly once, at account creation.
    async fn create_wallet(&self, owner_id: &str) -> Result<Wallet, LedgerError>;

    /// Fetches a wallet by its internal id, or `None` if it does not exist.
    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerError>;

    /// Fetches the wallet belonging to the given owner, or `None` if it does not exist.
    async fn fetch_wallet_for_owner(&self, owner_id: &str) -> Result<Option<Wallet>, LedgerError>;

    /// Appends a positive ledger entry and increments the wallet balance by the same amount, in a
    /// single atomic transaction. The balance delta is evaluated by the store itself
    /// (`balance = balance + ?`), never read-modify-write in application code.
    ///
    /// The entry amount must be strictly positive. Returns the new entry's id.
    async fn credit_wallet(&self, wallet_id: i64, entry: NewLedgerEntry) -> Result<i64, LedgerError>;

    /// Appends a negative ledger entry and decrements the wallet balance, in a single atomic
    /// transaction. The balance check happens under the same serialization as the update
    /// (`... WHERE balance >= ?`), so a debit can never drive a balance below zero.
    ///
    /// The entry amount must be strictly positive (it is stored negated). Fails with
    /// [`LedgerError::InsufficientBalance`] and leaves all state untouched if the wallet cannot cover
    /// the amount. Returns the new entry's id.
    async fn debit_wallet(&self, wallet_id: i64, entry: NewLedgerEntry) -> Result<i64, LedgerError>;

    /// Records a settled payment and credits the net amount, in one atomic transaction:
    /// * inserts the [`Payment`] row keyed by the external order id. The UNIQUE constraint on that
    ///   column is the authoritative deduplication point: if another delivery of the same order id got
    ///   there first — even concurrently — the insert is detected as a duplicate and **nothing** is
    ///   changed.
    /// * appends the `Payment` ledger entry for the net amount, referencing the order id, and
    ///   increments the wallet balance.
    ///
    /// Returns which of the two outcomes happened.
    async fn settle_order(&self, wallet_id: i64, payment: NewPayment) -> Result<InsertPaymentResult, LedgerError>;

    /// Fetches the payment for the given external order id, or `None` if the order never settled.
    async fn fetch_payment_by_order_id(&self, order_id: &OrderId) -> Result<Option<Payment>, LedgerError>;

    /// Stores a new payment link. The public link code must be unique.
    async fn create_payment_link(&self, link: NewPaymentLink) -> Result<PaymentLink, LedgerError>;

    /// Fetches a payment link by its public code, or `None` if it does not exist.
    async fn fetch_payment_link(&self, link_code: &str) -> Result<Option<PaymentLink>, LedgerError>;

    /// Marks a payment link inactive. Inactive links no longer resolve for settlement.
    async fn deactivate_payment_link(&self, link_code: &str) -> Result<(), LedgerError>;

    /// Creates a pending withdrawal request after checking, under the wallet's serialization, that the
    /// current balance covers the requested amount. No money moves; the request only records intent.
    ///
    /// Fails with [`LedgerError::InsufficientBalance`] if the balance does not cover the amount, and
    /// with [`LedgerError::WalletNotFoundForOwner`] if the owner has no wallet.
    async fn insert_withdrawal_request(
        &self,
        request: NewWithdrawalRequest,
    ) -> Result<WithdrawalRequest, LedgerError>;

    /// Applies an operator decision to a pending withdrawal request, in one atomic transaction.
    ///
    /// * `Approved`: debits the wallet for the request amount (entry type `Withdrawal`, reference =
    ///   request id) and marks the request approved. If the balance no longer covers the amount, the
    ///   request is marked **rejected** instead, with the failure reason appended to the notes —
    ///   approval never partially succeeds.
    /// * `Rejected`: marks the request rejected. No ledger effect.
    ///
    /// Fails with [`LedgerError::WithdrawalNotFound`] if the request does not exist and with
    /// [`LedgerError::AlreadyProcessed`] if it is not pending; processed requests are terminal.
    async fn process_withdrawal_request(
        &self,
        request_id: i64,
        decision: WithdrawalDecision,
        processed_by: &Actor,
        notes: Option<String>,
    ) -> Result<ProcessedWithdrawal, LedgerError>;

    /// Files the payout provider's order id against an approved withdrawal request, once the
    /// operator has executed the payout.
    ///
    /// Fails with [`LedgerError::WithdrawalNotFound`] if the request does not exist and with
    /// [`LedgerError::NotApproved`] for any request that is not in the approved state.
    async fn record_payout_order(&self, request_id: i64, payout_order_id: &str) -> Result<WithdrawalRequest, LedgerError>;

    /// Recomputes the sum of all ledger entries for the wallet, straight from the store.
    async fn ledger_sum_for_wallet(&self, wallet_id: i64) -> Result<MicroUsd, LedgerError>;

    /// Returns the ids of all wallets, for reconciliation sweeps.
    async fn wallet_ids(&self) -> Result<Vec<i64>, LedgerError>;

    /// Returns payments that have no matching `Payment` ledger entry for their order id. A non-empty
    /// result means a settlement recorded its payment but never credited; that state requires manual
    /// reconciliation and is never repaired automatically.
    async fn fetch_orphaned_payments(&self) -> Result<Vec<Payment>, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Outcome of [`LedgerDatabase::settle_order`].
#[derive(Debug, Clone)]
pub enum InsertPaymentResult {
    /// The payment row and its credit entry were created.
    Inserted { payment: Payment, entry_id: i64 },
    /// The order id had already settled; nothing was changed.
    AlreadyExists(Payment),
}

/// Outcome of [`LedgerDatabase::process_withdrawal_request`]. When the decision resulted in a debit,
/// `wallet_id` and `debit_entry_id` identify the ledger entry that moved the money.
#[derive(Debug, Clone)]
pub struct ProcessedWithdrawal {
    pub request: WithdrawalRequest,
    pub wallet_id: Option<i64>,
    pub debit_entry_id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Monetary amounts must be strictly positive, got {0}")]
    InvalidAmount(MicroUsd),
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: MicroUsd, available: MicroUsd },
    #[error("Wallet #{0} does not exist")]
    WalletNotFound(i64),
    #[error("No wallet exists for owner {0}")]
    WalletNotFoundForOwner(String),
    #[error("A wallet already exists for owner {0}")]
    WalletAlreadyExists(String),
    #[error("A payment link with code {0} already exists")]
    PaymentLinkAlreadyExists(String),
    #[error("Withdrawal request #{0} does not exist")]
    WithdrawalNotFound(i64),
    #[error("Withdrawal request #{0} has already been processed")]
    AlreadyProcessed(i64),
    #[error("Withdrawal request #{0} is not approved; only approved requests carry a payout order id")]
    NotApproved(i64),
    #[error("Wallet #{wallet_id} balance {balance} diverges from its ledger sum {ledger_sum}")]
    ReconciliationMismatch { wallet_id: i64, balance: MicroUsd, ledger_sum: MicroUsd },
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
