//! Stablecoin Payment Gateway Engine
//!
//! The SPG engine is the ledger and balance-integrity core of the merchant payment platform. Vendors
//! receive stablecoin payments through hosted payment links, accumulate a wallet balance, and withdraw
//! to their local bank accounts. Everything that moves money runs through this library; the HTTP layer,
//! dashboards and admin tooling are thin clients of the APIs exposed here.
//!
//! The library is divided into three main sections:
//! 1. Backend contracts ([`mod@traits`]). These define the behaviour a storage backend must expose:
//!    the transactional [`traits::LedgerDatabase`] unit of work that keeps every wallet's balance equal
//!    to the sum of its ledger history, and the read-only [`traits::WalletManagement`] queries used by
//!    dashboards and the admin review UI. SQLite is the supported backend ([`SqliteDatabase`]).
//! 2. The engine public API ([`mod@spe_api`]). [`LedgerApi`] is the only component permitted to mutate
//!    wallet balances; [`SettlementApi`] turns authenticated payment-processor events into exactly-once
//!    wallet credits; [`WithdrawalApi`] validates and records withdrawal intents for operator review.
//! 3. Events ([`mod@events`]). Every credit, debit and withdrawal decision publishes an audit-worthy
//!    event that external consumers (audit log, notifications) can hook into.

#[cfg(feature = "sqlite")]
mod sqlite;

pub mod config;
pub mod db_types;
pub mod events;
pub mod fees;
pub mod helpers;
pub mod processor_types;
mod spe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use spe_api::{
    errors::{SettlementError, WithdrawalError},
    ledger_api::{LedgerApi, ReconciliationReport},
    settlement_api::SettlementApi,
    settlement_objects::SettlementOutcome,
    withdrawal_api::{WithdrawalApi, WithdrawalPolicy},
};
