use std::fmt::Debug;

use futures_util::future::try_join_all;
use log::*;
use serde_json::json;
use spg_common::MicroUsd;

use crate::{
    db_types::{Actor, EntryType, LedgerEntry, NewLedgerEntry, Payment, Wallet},
    events::{EventProducers, WalletCreditedEvent, WalletDebitedEvent},
    traits::{LedgerDatabase, LedgerError, WalletManagement, WalletQueryError},
};

/// `LedgerApi` is the single gateway for wallet mutations.
///
/// Credits and debits validated here are handed to the backend, which applies the entry insert and
/// the balance update as one transaction. Nothing else in the system writes a balance, which is what
/// makes the reconciliation sweep meaningful: if a balance ever diverges from its ledger sum, data
/// was corrupted outside the sanctioned path, and the sweep fails loudly rather than patching it up.
pub struct LedgerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerDatabase
{
    /// Creates the wallet for a new account holder with a zero balance.
    pub async fn create_wallet(&self, owner_id: &str) -> Result<Wallet, LedgerError> {
        let wallet = self.db.create_wallet(owner_id).await?;
        debug!("🏦️ Created wallet #{} for owner {owner_id}", wallet.id);
        Ok(wallet)
    }

    /// Credits a wallet. The entry amount must be strictly positive.
    ///
    /// Appends the ledger entry and increments the balance atomically, then notifies audit
    /// subscribers. Returns the new entry id.
    pub async fn credit(&self, actor: &Actor, wallet_id: i64, entry: NewLedgerEntry) -> Result<i64, LedgerError> {
        if !entry.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(entry.amount));
        }
        let (amount, entry_type, reference) = (entry.amount, entry.entry_type, entry.reference_id.clone());
        let entry_id = self.db.credit_wallet(wallet_id, entry).await?;
        debug!("🏦️💰️ Credited {amount} to wallet #{wallet_id} ({entry_type} entry #{entry_id})");
        let event = WalletCreditedEvent::new(wallet_id, entry_id, entry_type, amount, reference, actor.clone());
        self.call_credited_hook(event).await;
        Ok(entry_id)
    }

    /// Debits a wallet. The entry amount must be strictly positive.
    ///
    /// The balance check and decrement happen under the wallet's serialization in the backend; a
    /// debit the balance cannot cover fails with [`LedgerError::InsufficientBalance`] and changes
    /// nothing. Returns the new entry id.
    pub async fn debit(&self, actor: &Actor, wallet_id: i64, entry: NewLedgerEntry) -> Result<i64, LedgerError> {
        if !entry.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(entry.amount));
        }
        let (amount, entry_type, reference) = (entry.amount, entry.entry_type, entry.reference_id.clone());
        let entry_id = self.db.debit_wallet(wallet_id, entry).await?;
        debug!("🏦️💸️ Debited {amount} from wallet #{wallet_id} ({entry_type} entry #{entry_id})");
        let event = WalletDebitedEvent::new(wallet_id, entry_id, entry_type, amount, reference, actor.clone());
        self.call_debited_hook(event).await;
        Ok(entry_id)
    }

    /// Records a manual, operator-attributed correction.
    ///
    /// This is the sanctioned vehicle for compensating a credit after a refunded or failed order, and
    /// for any other out-of-band fix. `amount` is signed: positive adjusts up, negative adjusts down.
    /// The operator identity and reason are stored in the entry's metadata.
    pub async fn record_adjustment(
        &self,
        operator: &Actor,
        wallet_id: i64,
        amount: MicroUsd,
        reason: &str,
    ) -> Result<i64, LedgerError> {
        if amount.value() == 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let metadata = json!({ "reason": reason, "recorded_by": operator.to_string() });
        info!("🏦️🛠️ Manual adjustment of {amount} on wallet #{wallet_id} by {operator}: {reason}");
        let magnitude = if amount.is_negative() { -amount } else { amount };
        let entry = NewLedgerEntry::new(magnitude, EntryType::Adjustment).with_metadata(metadata);
        if amount.is_negative() {
            self.debit(operator, wallet_id, entry).await
        } else {
            self.credit(operator, wallet_id, entry).await
        }
    }

    /// Recomputes the wallet's ledger sum and checks it against the stored balance.
    ///
    /// A mismatch is an internal invariant violation. It is fatal to the reconciliation run and is
    /// never auto-corrected; the error carries both figures for the alert.
    pub async fn reconcile_wallet(&self, wallet_id: i64) -> Result<(), LedgerError> {
        let wallet = self.db.fetch_wallet(wallet_id).await?.ok_or(LedgerError::WalletNotFound(wallet_id))?;
        let ledger_sum = self.db.ledger_sum_for_wallet(wallet_id).await?;
        if wallet.balance != ledger_sum {
            error!(
                "🚨️ RECONCILIATION MISMATCH: wallet #{wallet_id} holds {} but its ledger sums to {ledger_sum}. \
                 Refusing to continue; this needs investigation, not correction.",
                wallet.balance
            );
            return Err(LedgerError::ReconciliationMismatch { wallet_id, balance: wallet.balance, ledger_sum });
        }
        trace!("🏦️🧾️ Wallet #{wallet_id} reconciles at {ledger_sum}");
        Ok(())
    }

    /// Sweeps every wallet and checks for payments that were recorded without their credit.
    ///
    /// Wallets are independent, so they reconcile concurrently. The first balance mismatch aborts the
    /// sweep with [`LedgerError::ReconciliationMismatch`]. Orphaned payments do not abort — they are
    /// the known recoverable inconsistency (a settlement that died between recording and crediting)
    /// and are reported for manual reconciliation.
    pub async fn reconcile_all(&self) -> Result<ReconciliationReport, LedgerError> {
        let ids = self.db.wallet_ids().await?;
        try_join_all(ids.iter().map(|id| self.reconcile_wallet(*id))).await?;
        let orphaned_payments = self.db.fetch_orphaned_payments().await?;
        for payment in &orphaned_payments {
            error!(
                "🚨️ Order {} recorded a payment of {} for {} but no matching ledger credit exists. Manual \
                 reconciliation required.",
                payment.order_id, payment.net_amount, payment.owner_id
            );
        }
        info!(
            "🏦️🧾️ Reconciliation sweep complete: {} wallets checked, {} orphaned payments",
            ids.len(),
            orphaned_payments.len()
        );
        Ok(ReconciliationReport { wallets_checked: ids.len(), orphaned_payments })
    }

    async fn call_credited_hook(&self, event: WalletCreditedEvent) {
        for emitter in &self.producers.wallet_credited_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_debited_hook(&self, event: WalletDebitedEvent) {
        for emitter in &self.producers.wallet_debited_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

impl<B> LedgerApi<B>
where B: WalletManagement
{
    /// The owner's current balance, for dashboard display.
    pub async fn balance_for_owner(&self, owner_id: &str) -> Result<MicroUsd, WalletQueryError> {
        self.db.balance_for_owner(owner_id).await
    }

    pub async fn wallet_for_owner(&self, owner_id: &str) -> Result<Option<Wallet>, WalletQueryError> {
        self.db.wallet_for_owner(owner_id).await
    }

    /// The wallet's full statement, oldest entry first.
    pub async fn entries_for_wallet(&self, wallet_id: i64) -> Result<Vec<LedgerEntry>, WalletQueryError> {
        self.db.ledger_entries_for_wallet(wallet_id).await
    }
}

/// Result of a clean [`LedgerApi::reconcile_all`] sweep.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub wallets_checked: usize,
    /// Payments with no matching ledger credit. Empty on a healthy system.
    pub orphaned_payments: Vec<Payment>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned_payments.is_empty()
    }
}
