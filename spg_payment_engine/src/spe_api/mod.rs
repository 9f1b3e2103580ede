//! # Payment engine public API
//!
//! The `spe_api` module exposes the programmatic API for the stablecoin payment engine. The API is
//! modular so clients can pick the functionality they need — the dashboard only ever constructs a
//! [`ledger_api::LedgerApi`] for balances and statements, while the webhook layer only needs a
//! [`settlement_api::SettlementApi`].
//!
//! * [`ledger_api`] owns every wallet mutation: credits, debits, manual adjustments, and the
//!   reconciliation sweep that proves each balance equals the sum of its ledger history.
//! * [`settlement_api`] turns authenticated payment-processor events into exactly-once wallet
//!   credits, and flags failed/refunded notices that need operator follow-up.
//! * [`withdrawal_api`] validates and records withdrawal intents and applies operator decisions.
//!
//! # API usage
//!
//! The pattern for all the APIs is the same. An API instance is created by supplying a database
//! backend that implements the backend traits required by the API.
//!
//! ```rust,ignore
//! use spg_payment_engine::{LedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements LedgerDatabase and WalletManagement
//! let api = LedgerApi::new(db, producers);
//! let balance = api.balance_for_owner("vendor-42").await?;
//! ```

pub mod errors;
pub mod ledger_api;
pub mod settlement_api;
pub mod settlement_objects;
pub mod withdrawal_api;
