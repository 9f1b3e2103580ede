//! # Backend contracts for the payment engine.
//!
//! This module defines the interface contracts a storage backend must fulfil to carry the ledger.
//!
//! ## Wallets and the ledger
//! A wallet is the durable balance record for one account holder. Balances are never written directly:
//! every mutation flows through a [`LedgerDatabase`] operation that appends an immutable, signed ledger
//! entry and applies the matching balance delta in the same database transaction. That unit of work is
//! what upholds the engine's standing invariant — a wallet's balance always equals the sum of its
//! ledger history.
//!
//! ## Traits
//! * [`LedgerDatabase`] is the transactional unit-of-work boundary: wallet creation, credits, debits,
//!   exactly-once settlement, withdrawal lifecycle and reconciliation primitives.
//! * [`WalletManagement`] provides the read-only queries collaborators need: balances for dashboards,
//!   ledger statements for audit, pending withdrawals for the admin review UI.
//! * [`WebhookVerifier`] authenticates raw payment-processor webhook payloads before the settlement
//!   flow will look at them, and is pluggable so settlement is testable without cryptographic material.

mod event_verification;
mod ledger_database;
mod wallet_management;

pub use event_verification::{AuthenticationError, WebhookVerifier};
pub use ledger_database::{InsertPaymentResult, LedgerDatabase, LedgerError, ProcessedWithdrawal};
pub use wallet_management::{WalletManagement, WalletQueryError};
