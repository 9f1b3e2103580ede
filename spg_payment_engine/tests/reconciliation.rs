use spg_common::MicroUsd;
use spg_payment_engine::{
    db_types::{Actor, WithdrawalDecision},
    events::EventProducers,
    fees::FeeSchedule,
    processor_types::SettlementEvent,
    traits::{LedgerError, WalletManagement},
    LedgerApi,
    SettlementApi,
    SqliteDatabase,
    WithdrawalApi,
    WithdrawalPolicy,
};

use crate::support::{new_vendor, prepare_env::{prepare_test_env, random_db_path}, CUSTODY_ADDRESS};

mod support;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

#[tokio::test]
async fn balances_match_ledger_sums_after_mixed_activity() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(500);
    let (wallet, link) = new_vendor(&db, "vendor-1", "Premium plan", price).await;
    let settlement =
        SettlementApi::new(db.clone(), CUSTODY_ADDRESS, FeeSchedule::default(), EventProducers::default());
    let withdrawals = WithdrawalApi::new(db.clone(), WithdrawalPolicy::default(), EventProducers::default());
    let ledger = LedgerApi::new(db.clone(), EventProducers::default());

    // A settlement, a withdrawal and a manual correction later, every balance still equals its
    // ledger sum.
    let event = SettlementEvent::completed("ord_1", CUSTODY_ADDRESS, link.link_code.as_str(), price);
    settlement.handle_event(event).await.unwrap();
    let request = withdrawals
        .request_withdrawal(&Actor::owner("vendor-1"), MicroUsd::from_dollars(100))
        .await
        .unwrap();
    withdrawals
        .process_withdrawal(&Actor::operator("ops-1"), request.id, WithdrawalDecision::Approved, None)
        .await
        .unwrap();
    ledger
        .record_adjustment(&Actor::operator("ops-1"), wallet.id, MicroUsd::from_dollars(1), "goodwill credit")
        .await
        .unwrap();

    let report = ledger.reconcile_all().await.expect("the sweep should pass");
    assert_eq!(report.wallets_checked, 1);
    assert!(report.is_clean());
    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(393_500_000));
}

#[tokio::test]
async fn tampered_balances_are_fatal_to_the_sweep() {
    let db = new_db().await;
    let (wallet, _) = new_vendor(&db, "vendor-1", "Premium plan", MicroUsd::from_dollars(10)).await;
    let ledger = LedgerApi::new(db.clone(), EventProducers::default());

    // Write a balance outside the sanctioned path, as a bug or bad migration would.
    sqlx::query("UPDATE wallets SET balance = balance + 1 WHERE id = ?")
        .bind(wallet.id)
        .execute(db.pool())
        .await
        .unwrap();

    let err = ledger.reconcile_wallet(wallet.id).await.expect_err("divergence must be fatal");
    assert!(matches!(err, LedgerError::ReconciliationMismatch { wallet_id, .. } if wallet_id == wallet.id));
    let err = ledger.reconcile_all().await.expect_err("the sweep must refuse to continue");
    assert!(matches!(err, LedgerError::ReconciliationMismatch { .. }));
}

#[tokio::test]
async fn payments_without_credits_are_reported_for_manual_reconciliation() {
    let db = new_db().await;
    new_vendor(&db, "vendor-1", "Premium plan", MicroUsd::from_dollars(10)).await;
    let ledger = LedgerApi::new(db.clone(), EventProducers::default());

    // A payment row with no matching credit: the trace left by a settlement that died between
    // recording and crediting.
    sqlx::query(
        r#"INSERT INTO payments (order_id, owner_id, link_code, gross_amount, fee_amount, net_amount)
           VALUES ('ord_orphan', 'vendor-1', 'lnk_x', 10000000, 150000, 9850000)"#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let report = ledger.reconcile_all().await.expect("orphans are reported, not fatal");
    assert!(!report.is_clean());
    assert_eq!(report.orphaned_payments.len(), 1);
    assert_eq!(report.orphaned_payments[0].order_id.as_str(), "ord_orphan");
}
