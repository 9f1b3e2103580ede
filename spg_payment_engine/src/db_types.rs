use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spg_common::MicroUsd;
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The payment processor's identifier for a completed transaction. One `OrderId` settles at most once;
/// it is the idempotency key for the whole settlement flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Actor        ---------------------------------------------------------
/// The authenticated identity a request executes on behalf of.
///
/// Every API call that mutates money takes an `Actor` so that ledger entries, withdrawal decisions and
/// audit events always carry who did what. The identity is established by the (out of scope) API layer
/// and passed in explicitly; the engine holds no ambient authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    /// A vendor acting on their own wallet.
    Owner(String),
    /// A platform operator with review authority.
    Operator(String),
    /// Internal machinery: webhook settlement, reconciliation jobs.
    System,
}

impl Actor {
    pub fn owner<S: Into<String>>(id: S) -> Self {
        Self::Owner(id.into())
    }

    pub fn operator<S: Into<String>>(id: S) -> Self {
        Self::Operator(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            Actor::Owner(id) | Actor::Operator(id) => id.as_str(),
            Actor::System => "system",
        }
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Owner(id) => write!(f, "owner:{id}"),
            Actor::Operator(id) => write!(f, "operator:{id}"),
            Actor::System => write!(f, "system"),
        }
    }
}

//--------------------------------------      EntryType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryType {
    /// A settled inbound payment (always a credit).
    Payment,
    /// An approved withdrawal (always a debit).
    Withdrawal,
    /// A platform fee movement.
    Fee,
    /// A manual, operator-attributed correction.
    Adjustment,
}

impl Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::Payment => write!(f, "Payment"),
            EntryType::Withdrawal => write!(f, "Withdrawal"),
            EntryType::Fee => write!(f, "Fee"),
            EntryType::Adjustment => write!(f, "Adjustment"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

impl FromStr for EntryType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Payment" => Ok(Self::Payment),
            "Withdrawal" => Ok(Self::Withdrawal),
            "Fee" => Ok(Self::Fee),
            "Adjustment" => Ok(Self::Adjustment),
            s => Err(ConversionError(format!("Invalid entry type: {s}"))),
        }
    }
}

//--------------------------------------        Wallet        ---------------------------------------------------------
/// The durable balance record for one account holder.
///
/// A wallet is created once, with a zero balance, when the account is created. Its balance is mutated
/// exclusively through [`crate::traits::LedgerDatabase`] operations; nothing else writes to it. The
/// standing invariant is that `balance` equals the sum of all [`LedgerEntry`] amounts for the wallet.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub owner_id: String,
    pub balance: MicroUsd,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     LedgerEntry      ---------------------------------------------------------
/// An immutable, signed monetary movement. Entries are append-only; they are never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub wallet_id: i64,
    /// Signed movement in micro-USD. Positive entries are credits, negative entries are debits.
    pub amount: MicroUsd,
    pub entry_type: EntryType,
    /// External reference for traceability and idempotency, e.g. the processor order id for a payment
    /// credit, or the withdrawal request id for a withdrawal debit.
    pub reference_id: Option<String>,
    /// Opaque JSON attached by the caller.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    /// The magnitude of the movement. Always strictly positive; credit/debit determines the sign.
    pub amount: MicroUsd,
    pub entry_type: EntryType,
    pub reference_id: Option<String>,
    pub metadata: Option<String>,
}

impl NewLedgerEntry {
    pub fn new(amount: MicroUsd, entry_type: EntryType) -> Self {
        Self { amount, entry_type, reference_id: None, metadata: None }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference_id: S) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata.to_string());
        self
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    Completed,
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Completed" => Ok(Self::Completed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------       Payment        ---------------------------------------------------------
/// The record of one completed inbound transaction. At most one `Payment` exists per external order id;
/// the UNIQUE constraint on `order_id` is the final idempotency backstop under concurrent redelivery.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub owner_id: String,
    pub link_code: String,
    pub gross_amount: MicroUsd,
    pub fee_amount: MicroUsd,
    pub net_amount: MicroUsd,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub owner_id: String,
    pub link_code: String,
    pub gross_amount: MicroUsd,
    pub fee_amount: MicroUsd,
    pub net_amount: MicroUsd,
    pub description: Option<String>,
}

//--------------------------------------     PaymentLink      ---------------------------------------------------------
/// A shareable request-for-payment. Links are created by the vendor-facing link generator and resolved
/// here to route an incoming settlement to its owner's wallet.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: i64,
    pub link_code: String,
    pub owner_id: String,
    pub product_name: String,
    pub amount: MicroUsd,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentLink {
    pub link_code: String,
    pub owner_id: String,
    pub product_name: String,
    pub amount: MicroUsd,
}

impl NewPaymentLink {
    /// Creates a new link with a freshly generated public code.
    pub fn new<S: Into<String>, P: Into<String>>(owner_id: S, product_name: P, amount: MicroUsd) -> Self {
        Self {
            link_code: crate::helpers::new_link_code(),
            owner_id: owner_id.into(),
            product_name: product_name.into(),
            amount,
        }
    }
}

//--------------------------------------  WithdrawalStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Awaiting an operator decision.
    Pending,
    /// Approved and debited. Terminal.
    Approved,
    /// Rejected; no ledger effect. Terminal.
    Rejected,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "Pending"),
            WithdrawalStatus::Approved => write!(f, "Approved"),
            WithdrawalStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid withdrawal status: {s}"))),
        }
    }
}

//--------------------------------------     ReviewTier       ---------------------------------------------------------
/// Escalation tier for a withdrawal request. Requests at or above the enhanced-review threshold are
/// tagged `Manual` for compliance escalation; the tag never blocks creation, and operators always
/// retain the final decision either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ReviewTier {
    Auto,
    Manual,
}

impl Display for ReviewTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewTier::Auto => write!(f, "Auto"),
            ReviewTier::Manual => write!(f, "Manual"),
        }
    }
}

impl FromStr for ReviewTier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Auto" => Ok(Self::Auto),
            "Manual" => Ok(Self::Manual),
            s => Err(ConversionError(format!("Invalid review tier: {s}"))),
        }
    }
}

//-------------------------------------- WithdrawalDecision   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalDecision {
    Approved,
    Rejected,
}

impl Display for WithdrawalDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalDecision::Approved => write!(f, "Approved"),
            WithdrawalDecision::Rejected => write!(f, "Rejected"),
        }
    }
}

//-------------------------------------- WithdrawalRequest    ---------------------------------------------------------
/// A vendor's intent to withdraw funds. Created `Pending` by the withdrawal authorizer and transitioned
/// exactly once, by an operator, to `Approved` (with the matching ledger debit) or `Rejected`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: i64,
    pub owner_id: String,
    pub amount: MicroUsd,
    pub status: WithdrawalStatus,
    pub tier: ReviewTier,
    /// The operator that processed the request, once processed.
    pub processed_by: Option<String>,
    /// The payout provider's order id, filed by the operator on execution.
    pub payout_order_id: Option<String>,
    pub notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    pub fn requires_enhanced_review(&self) -> bool {
        self.tier == ReviewTier::Manual
    }

    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }
}

#[derive(Debug, Clone)]
pub struct NewWithdrawalRequest {
    pub owner_id: String,
    pub amount: MicroUsd,
    pub tier: ReviewTier,
}
