//! Audit-worthy engine events.
//!
//! One event is published for every credit, every debit, and every withdrawal decision. Each carries
//! the acting identity, the entity it touched and the moment it happened, which is everything an
//! external audit-log consumer needs to reconstruct who did what, when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spg_common::MicroUsd;

use crate::db_types::{Actor, EntryType, WithdrawalRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCreditedEvent {
    pub wallet_id: i64,
    pub entry_id: i64,
    pub entry_type: EntryType,
    pub amount: MicroUsd,
    pub reference_id: Option<String>,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

impl WalletCreditedEvent {
    pub fn new(
        wallet_id: i64,
        entry_id: i64,
        entry_type: EntryType,
        amount: MicroUsd,
        reference_id: Option<String>,
        actor: Actor,
    ) -> Self {
        Self { wallet_id, entry_id, entry_type, amount, reference_id, actor, at: Utc::now() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDebitedEvent {
    pub wallet_id: i64,
    pub entry_id: i64,
    pub entry_type: EntryType,
    pub amount: MicroUsd,
    pub reference_id: Option<String>,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

impl WalletDebitedEvent {
    pub fn new(
        wallet_id: i64,
        entry_id: i64,
        entry_type: EntryType,
        amount: MicroUsd,
        reference_id: Option<String>,
        actor: Actor,
    ) -> Self {
        Self { wallet_id, entry_id, entry_type, amount, reference_id, actor, at: Utc::now() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalDecidedEvent {
    pub request: WithdrawalRequest,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

impl WithdrawalDecidedEvent {
    pub fn new(request: WithdrawalRequest, actor: Actor) -> Self {
        Self { request, actor, at: Utc::now() }
    }
}
