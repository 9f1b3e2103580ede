use std::fmt::Debug;

use log::*;
use spg_common::MicroUsd;

use crate::{
    db_types::{
        Actor,
        EntryType,
        NewWithdrawalRequest,
        ReviewTier,
        WithdrawalDecision,
        WithdrawalRequest,
        WithdrawalStatus,
    },
    events::{EventProducers, WalletDebitedEvent, WithdrawalDecidedEvent},
    spe_api::errors::WithdrawalError,
    traits::{LedgerDatabase, WalletManagement, WalletQueryError},
};

/// Policy thresholds for vendor withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalPolicy {
    /// Requests below this floor are not accepted.
    pub minimum: MicroUsd,
    /// Requests at or above this amount are tagged for enhanced compliance review.
    pub enhanced_review_threshold: MicroUsd,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self { minimum: MicroUsd::from_dollars(25), enhanced_review_threshold: MicroUsd::from_dollars(10_000) }
    }
}

/// `WithdrawalApi` validates and records withdrawal intents; it moves no money of its own.
///
/// A request only ever records that a vendor wants funds out. The debit happens when an operator
/// approves the request, and even then the engine re-checks the balance under the wallet's
/// serialization — an approval that can no longer be covered converts to a rejection rather than
/// half-applying.
pub struct WithdrawalApi<B> {
    db: B,
    policy: WithdrawalPolicy,
    producers: EventProducers,
}

impl<B> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi")
    }
}

impl<B> WithdrawalApi<B> {
    pub fn new(db: B, policy: WithdrawalPolicy, producers: EventProducers) -> Self {
        Self { db, policy, producers }
    }

    pub fn policy(&self) -> &WithdrawalPolicy {
        &self.policy
    }
}

impl<B> WithdrawalApi<B>
where B: LedgerDatabase
{
    /// Records a vendor's withdrawal intent as a pending request.
    ///
    /// Fails with [`WithdrawalError::BelowMinimum`] under the policy floor, and with
    /// [`crate::traits::LedgerError::InsufficientBalance`] if the wallet cannot cover the amount at
    /// request time. Amounts at or above the enhanced-review threshold are tagged `Manual` for the
    /// compliance queue — the tag never blocks creation, and large withdrawals are never
    /// auto-approved.
    pub async fn request_withdrawal(&self, owner: &Actor, amount: MicroUsd) -> Result<WithdrawalRequest, WithdrawalError> {
        if amount < self.policy.minimum {
            debug!("🏧️ Withdrawal of {amount} requested by {owner} is below the {} floor.", self.policy.minimum);
            return Err(WithdrawalError::BelowMinimum { requested: amount, minimum: self.policy.minimum });
        }
        let tier =
            if amount >= self.policy.enhanced_review_threshold { ReviewTier::Manual } else { ReviewTier::Auto };
        let request = NewWithdrawalRequest { owner_id: owner.id().to_string(), amount, tier };
        let request = self.db.insert_withdrawal_request(request).await?;
        if request.requires_enhanced_review() {
            info!(
                "🏧️🚩️ Withdrawal request #{} of {amount} by {} is flagged for enhanced review.",
                request.id, request.owner_id
            );
        } else {
            debug!("🏧️ Withdrawal request #{} of {amount} by {} is pending review.", request.id, request.owner_id);
        }
        Ok(request)
    }

    /// Applies an operator's decision to a pending request.
    ///
    /// Approval debits the wallet atomically with the status change; if the balance has shrunk since
    /// the request was made, the request is rejected instead and the reason recorded — the operator
    /// sees a rejection, not a crash. Either way the request reaches a terminal state exactly once.
    pub async fn process_withdrawal(
        &self,
        operator: &Actor,
        request_id: i64,
        decision: WithdrawalDecision,
        notes: Option<String>,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        let processed = self.db.process_withdrawal_request(request_id, decision, operator, notes).await?;
        let request = processed.request;
        match (decision, request.status) {
            (WithdrawalDecision::Approved, WithdrawalStatus::Rejected) => {
                warn!(
                    "🏧️❌️ Withdrawal request #{request_id} could not be approved: the balance no longer covers \
                     {}. The request has been rejected and the reason recorded.",
                    request.amount
                );
            },
            (_, status) => {
                info!("🏧️ Withdrawal request #{request_id} of {} is now {status}.", request.amount);
            },
        }
        if let (Some(wallet_id), Some(entry_id)) = (processed.wallet_id, processed.debit_entry_id) {
            let event = WalletDebitedEvent::new(
                wallet_id,
                entry_id,
                EntryType::Withdrawal,
                request.amount,
                Some(request.id.to_string()),
                operator.clone(),
            );
            self.call_debited_hook(event).await;
        }
        self.call_decided_hook(WithdrawalDecidedEvent::new(request.clone(), operator.clone())).await;
        Ok(request)
    }

    /// Files the payout provider's order id against an approved request, once the operator has
    /// executed the payout.
    pub async fn record_payout_order(
        &self,
        operator: &Actor,
        request_id: i64,
        payout_order_id: &str,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        let request = self.db.record_payout_order(request_id, payout_order_id).await?;
        info!("🏧️ {operator} linked withdrawal request #{request_id} to payout order {payout_order_id}.");
        Ok(request)
    }

    async fn call_debited_hook(&self, event: WalletDebitedEvent) {
        for emitter in &self.producers.wallet_debited_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_decided_hook(&self, event: WithdrawalDecidedEvent) {
        for emitter in &self.producers.withdrawal_decided_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> WithdrawalApi<B>
where B: WalletManagement
{
    /// The admin review queue: pending requests, oldest first, optionally narrowed to one tier.
    pub async fn pending_withdrawals(
        &self,
        tier: Option<ReviewTier>,
    ) -> Result<Vec<WithdrawalRequest>, WalletQueryError> {
        self.db.pending_withdrawals(tier).await
    }

    pub async fn withdrawal_by_id(&self, request_id: i64) -> Result<Option<WithdrawalRequest>, WalletQueryError> {
        self.db.withdrawal_by_id(request_id).await
    }
}
