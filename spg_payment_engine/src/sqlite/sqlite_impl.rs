//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the
//! [`crate::traits`] module. Every money-moving method wraps its statements in one transaction, so
//! the entry-insert and balance-update pair commits or rolls back as a unit.

use std::fmt::Debug;

use log::*;
use spg_common::MicroUsd;
use sqlx::SqlitePool;

use super::{
    db::{ledger, payment_links, payments, wallets, withdrawals},
    db_url,
    new_pool,
};
use crate::{
    db_types::{
        Actor,
        EntryType,
        LedgerEntry,
        NewLedgerEntry,
        NewPayment,
        NewPaymentLink,
        NewWithdrawalRequest,
        OrderId,
        Payment,
        PaymentLink,
        ReviewTier,
        Wallet,
        WithdrawalDecision,
        WithdrawalRequest,
        WithdrawalStatus,
    },
    traits::{
        InsertPaymentResult,
        LedgerDatabase,
        LedgerError,
        ProcessedWithdrawal,
        WalletManagement,
        WalletQueryError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new() -> Result<Self, LedgerError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), 5).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_wallet(&self, owner_id: &str) -> Result<Wallet, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        wallets::insert_wallet(owner_id, &mut conn).await
    }

    async fn fetch_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::wallet_by_id(wallet_id, &mut conn).await?)
    }

    async fn fetch_wallet_for_owner(&self, owner_id: &str) -> Result<Option<Wallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::wallet_for_owner(owner_id, &mut conn).await?)
    }

    async fn credit_wallet(&self, wallet_id: i64, entry: NewLedgerEntry) -> Result<i64, LedgerError> {
        let mut tx = self.pool.begin().await?;
        wallets::adjust_balance(wallet_id, entry.amount, &mut tx).await?;
        let entry_id = ledger::insert_entry(wallet_id, entry.amount, &entry, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Wallet #{wallet_id} credited {} (entry #{entry_id})", entry.amount);
        Ok(entry_id)
    }

    async fn debit_wallet(&self, wallet_id: i64, entry: NewLedgerEntry) -> Result<i64, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let applied = wallets::guarded_debit(wallet_id, entry.amount, &mut tx).await?;
        if !applied {
            let available = wallets::wallet_by_id(wallet_id, &mut tx)
                .await?
                .ok_or(LedgerError::WalletNotFound(wallet_id))?
                .balance;
            return Err(LedgerError::InsufficientBalance { requested: entry.amount, available });
        }
        let entry_id = ledger::insert_entry(wallet_id, -entry.amount, &entry, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Wallet #{wallet_id} debited {} (entry #{entry_id})", entry.amount);
        Ok(entry_id)
    }

    async fn settle_order(&self, wallet_id: i64, payment: NewPayment) -> Result<InsertPaymentResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        match payments::insert_payment(&payment, &mut tx).await? {
            Some(stored) => {
                let entry = NewLedgerEntry::new(stored.net_amount, EntryType::Payment)
                    .with_reference(stored.order_id.as_str());
                let entry_id = ledger::insert_entry(wallet_id, stored.net_amount, &entry, &mut tx).await?;
                wallets::adjust_balance(wallet_id, stored.net_amount, &mut tx).await?;
                tx.commit().await?;
                debug!(
                    "🗃️ Order {} settled. {} credited to wallet #{wallet_id} (entry #{entry_id})",
                    stored.order_id, stored.net_amount
                );
                Ok(InsertPaymentResult::Inserted { payment: stored, entry_id })
            },
            None => {
                let existing = payments::payment_by_order_id(&payment.order_id, &mut tx).await?.ok_or_else(|| {
                    LedgerError::DatabaseError(format!(
                        "Duplicate insert detected for order {}, but no payment row could be read back",
                        payment.order_id
                    ))
                })?;
                debug!("🗃️ Order {} has already been settled. Not crediting again.", existing.order_id);
                Ok(InsertPaymentResult::AlreadyExists(existing))
            },
        }
    }

    async fn fetch_payment_by_order_id(&self, order_id: &OrderId) -> Result<Option<Payment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::payment_by_order_id(order_id, &mut conn).await?)
    }

    async fn create_payment_link(&self, link: NewPaymentLink) -> Result<PaymentLink, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let link = payment_links::insert_link(&link, &mut conn).await?;
        debug!("🗃️ Payment link {} created for {}", link.link_code, link.owner_id);
        Ok(link)
    }

    async fn fetch_payment_link(&self, link_code: &str) -> Result<Option<PaymentLink>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_links::link_by_code(link_code, &mut conn).await?)
    }

    async fn deactivate_payment_link(&self, link_code: &str) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment_links::deactivate_link(link_code, &mut conn).await?)
    }

    async fn insert_withdrawal_request(
        &self,
        request: NewWithdrawalRequest,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let wallet = wallets::wallet_for_owner(&request.owner_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFoundForOwner(request.owner_id.clone()))?;
        if wallet.balance < request.amount {
            return Err(LedgerError::InsufficientBalance { requested: request.amount, available: wallet.balance });
        }
        let stored = withdrawals::insert_request(&request, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Withdrawal request #{} of {} recorded for {}", stored.id, stored.amount, stored.owner_id);
        Ok(stored)
    }

    async fn process_withdrawal_request(
        &self,
        request_id: i64,
        decision: WithdrawalDecision,
        processed_by: &Actor,
        notes: Option<String>,
    ) -> Result<ProcessedWithdrawal, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let request = withdrawals::request_by_id(request_id, &mut tx)
            .await?
            .ok_or(LedgerError::WithdrawalNotFound(request_id))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(LedgerError::AlreadyProcessed(request_id));
        }
        let processor = processed_by.to_string();
        match decision {
            WithdrawalDecision::Rejected => {
                let updated = withdrawals::mark_processed(
                    request_id,
                    WithdrawalStatus::Rejected,
                    &processor,
                    notes.as_deref(),
                    &mut tx,
                )
                .await?;
                tx.commit().await?;
                debug!("🗃️ Withdrawal request #{request_id} rejected by {processed_by}.");
                Ok(ProcessedWithdrawal { request: updated, wallet_id: None, debit_entry_id: None })
            },
            WithdrawalDecision::Approved => {
                let wallet = wallets::wallet_for_owner(&request.owner_id, &mut tx)
                    .await?
                    .ok_or_else(|| LedgerError::WalletNotFoundForOwner(request.owner_id.clone()))?;
                let applied = wallets::guarded_debit(wallet.id, request.amount, &mut tx).await?;
                if applied {
                    let entry = NewLedgerEntry::new(request.amount, EntryType::Withdrawal)
                        .with_reference(request_id.to_string());
                    let entry_id = ledger::insert_entry(wallet.id, -request.amount, &entry, &mut tx).await?;
                    let updated = withdrawals::mark_processed(
                        request_id,
                        WithdrawalStatus::Approved,
                        &processor,
                        notes.as_deref(),
                        &mut tx,
                    )
                    .await?;
                    tx.commit().await?;
                    debug!(
                        "🗃️ Withdrawal request #{request_id} approved by {processed_by}. {} debited from wallet \
                         #{} (entry #{entry_id})",
                        request.amount, wallet.id
                    );
                    Ok(ProcessedWithdrawal {
                        request: updated,
                        wallet_id: Some(wallet.id),
                        debit_entry_id: Some(entry_id),
                    })
                } else {
                    // The balance shrank since the request was made. Approval must never partially
                    // succeed, so the request converts to a rejection with the reason recorded.
                    let reason = format!(
                        "Insufficient balance at approval time: available {}, requested {}",
                        wallet.balance, request.amount
                    );
                    let notes = match notes {
                        Some(n) => format!("{n} | {reason}"),
                        None => reason,
                    };
                    let updated = withdrawals::mark_processed(
                        request_id,
                        WithdrawalStatus::Rejected,
                        &processor,
                        Some(&notes),
                        &mut tx,
                    )
                    .await?;
                    tx.commit().await?;
                    warn!(
                        "🗃️ Withdrawal request #{request_id} could not be covered by wallet #{} and has been \
                         rejected.",
                        wallet.id
                    );
                    Ok(ProcessedWithdrawal { request: updated, wallet_id: None, debit_entry_id: None })
                }
            },
        }
    }

    async fn record_payout_order(
        &self,
        request_id: i64,
        payout_order_id: &str,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let request = withdrawals::request_by_id(request_id, &mut tx)
            .await?
            .ok_or(LedgerError::WithdrawalNotFound(request_id))?;
        if request.status != WithdrawalStatus::Approved {
            return Err(LedgerError::NotApproved(request_id));
        }
        let updated = withdrawals::set_payout_order(request_id, payout_order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Withdrawal request #{request_id} linked to payout order {payout_order_id}");
        Ok(updated)
    }

    async fn ledger_sum_for_wallet(&self, wallet_id: i64) -> Result<MicroUsd, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::sum_for_wallet(wallet_id, &mut conn).await?)
    }

    async fn wallet_ids(&self) -> Result<Vec<i64>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::all_wallet_ids(&mut conn).await?)
    }

    async fn fetch_orphaned_payments(&self) -> Result<Vec<Payment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::orphaned_payments(&mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl WalletManagement for SqliteDatabase {
    async fn balance_for_owner(&self, owner_id: &str) -> Result<MicroUsd, WalletQueryError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::wallet_for_owner(owner_id, &mut conn)
            .await?
            .ok_or_else(|| WalletQueryError::UnknownOwner(owner_id.to_string()))?;
        Ok(wallet.balance)
    }

    async fn wallet_for_owner(&self, owner_id: &str) -> Result<Option<Wallet>, WalletQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::wallet_for_owner(owner_id, &mut conn).await?)
    }

    async fn ledger_entries_for_wallet(&self, wallet_id: i64) -> Result<Vec<LedgerEntry>, WalletQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ledger::entries_for_wallet(wallet_id, &mut conn).await?)
    }

    async fn pending_withdrawals(
        &self,
        tier: Option<ReviewTier>,
    ) -> Result<Vec<WithdrawalRequest>, WalletQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(withdrawals::pending_requests(tier, &mut conn).await?)
    }

    async fn withdrawal_by_id(&self, request_id: i64) -> Result<Option<WithdrawalRequest>, WalletQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(withdrawals::request_by_id(request_id, &mut conn).await?)
    }

    async fn payments_for_owner(&self, owner_id: &str) -> Result<Vec<Payment>, WalletQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::payments_for_owner(owner_id, &mut conn).await?)
    }

    async fn payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, WalletQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::payment_by_order_id(order_id, &mut conn).await?)
    }
}
