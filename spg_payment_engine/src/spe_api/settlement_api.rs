use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    db_types::{Actor, EntryType, NewPayment, OrderId},
    events::{EventProducers, WalletCreditedEvent},
    fees::FeeSchedule,
    helpers::normalize_settlement_address,
    processor_types::{OrderEventStatus, SettlementEvent},
    spe_api::{errors::SettlementError, settlement_objects::SettlementOutcome},
    traits::{InsertPaymentResult, LedgerDatabase, WebhookVerifier},
};

/// `SettlementApi` turns authenticated payment-processor events into exactly-once wallet credits.
///
/// The flow tolerates the two things webhook delivery is worst at: redelivery and races. A redelivered
/// event short-circuits on the recorded payment; two deliveries racing each other are decided by the
/// UNIQUE constraint on the payment's order id, and the loser returns success without crediting.
pub struct SettlementApi<B> {
    db: B,
    fees: FeeSchedule,
    custody_address: String,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, custody_address: &str, fees: FeeSchedule, producers: EventProducers) -> Self {
        Self { db, fees, custody_address: normalize_settlement_address(custody_address), producers }
    }
}

impl<B> SettlementApi<B>
where B: LedgerDatabase
{
    /// Authenticates a raw webhook delivery and routes the event it carries.
    ///
    /// This is the full inbound path: nothing reaches the ledger unless the verifier accepted the
    /// payload first.
    pub async fn handle_webhook<V: WebhookVerifier>(
        &self,
        verifier: &V,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<SettlementOutcome, SettlementError> {
        let event = verifier.verify(payload, signature)?;
        self.handle_event(event).await
    }

    /// Routes an authenticated processor event to the settlement or reversal flow.
    pub async fn handle_event(&self, event: SettlementEvent) -> Result<SettlementOutcome, SettlementError> {
        match event.status {
            OrderEventStatus::Completed => self.settle(event).await,
            OrderEventStatus::Failed | OrderEventStatus::Refunded => {
                self.handle_order_reversal(&event.order_id, event.status).await
            },
        }
    }

    /// [`Self::handle_event`] with a processing deadline.
    ///
    /// Webhook handlers must answer the processor within a bounded time. If the deadline passes
    /// before the ledger credit lands, the caller reports failure and the processor redelivers —
    /// which the idempotency machinery makes safe.
    pub async fn handle_event_with_timeout(
        &self,
        event: SettlementEvent,
        limit: Duration,
    ) -> Result<SettlementOutcome, SettlementError> {
        match tokio::time::timeout(limit, self.handle_event(event)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("🔄️⏱️ Settlement did not complete within {limit:?}. Awaiting redelivery.");
                Err(SettlementError::Timeout(limit))
            },
        }
    }

    /// Settles a completed order: resolves the receiving vendor through the payment link, computes
    /// the fee split, records the payment and credits the net amount — the latter two atomically.
    pub async fn settle(&self, event: SettlementEvent) -> Result<SettlementOutcome, SettlementError> {
        let target = normalize_settlement_address(&event.target_address);
        if target != self.custody_address {
            debug!(
                "🔄️🙈️ Order {} targets address {}, not the custody address. Ignoring unrelated transaction.",
                event.order_id, event.target_address
            );
            return Ok(SettlementOutcome::Ignored);
        }
        // Fast idempotency check. The UNIQUE constraint in settle_order backstops the race where a
        // duplicate delivery slips past this read.
        if let Some(payment) = self.db.fetch_payment_by_order_id(&event.order_id).await? {
            info!("🔄️💰️ Order {} has already been settled. Redelivery is a no-op.", event.order_id);
            return Ok(SettlementOutcome::AlreadySettled(payment));
        }
        let link = self
            .db
            .fetch_payment_link(&event.link_code)
            .await?
            .filter(|link| link.active)
            .ok_or_else(|| {
                warn!(
                    "🔄️🔗️ No active payment link '{}' for incoming order {}. The event was NOT applied and needs \
                     operator attention. Event: {event:?}",
                    event.link_code, event.order_id
                );
                SettlementError::UnknownPaymentLink(event.link_code.clone())
            })?;
        let wallet = self.db.fetch_wallet_for_owner(&link.owner_id).await?.ok_or_else(|| {
            warn!(
                "🔄️🧑️ Payment link '{}' resolves to owner {}, who has no wallet. The event was NOT applied and \
                 needs operator attention. Event: {event:?}",
                link.link_code, link.owner_id
            );
            SettlementError::UnknownWallet(link.owner_id.clone())
        })?;
        if !event.amount.is_positive() {
            warn!("🔄️🚫️ Order {} arrived with a non-positive amount of {}. Rejecting.", event.order_id, event.amount);
            return Err(SettlementError::InvalidAmount(event.amount));
        }
        let split = self.fees.split(event.amount);
        let payment = NewPayment {
            order_id: event.order_id.clone(),
            owner_id: link.owner_id.clone(),
            link_code: link.link_code.clone(),
            gross_amount: split.gross,
            fee_amount: split.fee,
            net_amount: split.net,
            description: Some(link.product_name.clone()),
        };
        match self.db.settle_order(wallet.id, payment).await? {
            InsertPaymentResult::Inserted { payment, entry_id } => {
                info!(
                    "🔄️💰️ Order {} settled: {} gross, {} fee, {} net credited to wallet #{}",
                    payment.order_id, payment.gross_amount, payment.fee_amount, payment.net_amount, wallet.id
                );
                let event = WalletCreditedEvent::new(
                    wallet.id,
                    entry_id,
                    EntryType::Payment,
                    payment.net_amount,
                    Some(payment.order_id.to_string()),
                    Actor::System,
                );
                self.call_credited_hook(event).await;
                Ok(SettlementOutcome::Settled { payment, entry_id })
            },
            InsertPaymentResult::AlreadyExists(payment) => {
                info!(
                    "🔄️💰️ Order {} was settled concurrently by another delivery. The wallet was credited exactly \
                     once.",
                    payment.order_id
                );
                Ok(SettlementOutcome::AlreadySettled(payment))
            },
        }
    }

    /// Failed/refunded notices are accepted for any order. If the order never credited there is
    /// nothing to unwind. If it did, the engine refuses to reverse it on its own: an operator must
    /// record the compensating adjustment, and the outcome says so.
    async fn handle_order_reversal(
        &self,
        order_id: &OrderId,
        status: OrderEventStatus,
    ) -> Result<SettlementOutcome, SettlementError> {
        match self.db.fetch_payment_by_order_id(order_id).await? {
            None => {
                debug!("🔄️↩️ {status} notice for order {order_id}, which never credited. Nothing to do.");
                Ok(SettlementOutcome::NoEffect)
            },
            Some(payment) => {
                error!(
                    "🔄️↩️ {status} notice for order {order_id}, but {} was already credited to {}'s wallet. An \
                     operator must record a compensating adjustment; this is never automated.",
                    payment.net_amount, payment.owner_id
                );
                Ok(SettlementOutcome::ManualReversalRequired(payment))
            },
        }
    }

    async fn call_credited_hook(&self, event: WalletCreditedEvent) {
        for emitter in &self.producers.wallet_credited_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
