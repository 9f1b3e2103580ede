use std::time::Duration;

use spg_common::{MicroUsd, Secret};
use spg_payment_engine::{
    db_types::{Actor, EntryType},
    events::EventProducers,
    fees::FeeSchedule,
    helpers::{calculate_webhook_hmac, HmacVerifier},
    processor_types::{OrderEventStatus, SettlementEvent},
    traits::{LedgerDatabase, WalletManagement},
    LedgerApi,
    SettlementApi,
    SettlementError,
    SettlementOutcome,
    SqliteDatabase,
};

use crate::support::{new_vendor, prepare_env::{prepare_test_env, random_db_path}, CUSTODY_ADDRESS};

mod support;

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn settlement_api(db: SqliteDatabase) -> SettlementApi<SqliteDatabase> {
    SettlementApi::new(db, CUSTODY_ADDRESS, FeeSchedule::default(), EventProducers::default())
}

#[tokio::test]
async fn settling_an_order_credits_the_net_amount() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(500);
    let (wallet, link) = new_vendor(&db, "vendor-1", "Premium plan", price).await;
    let api = settlement_api(db.clone());

    let event = SettlementEvent::completed("ord_1", CUSTODY_ADDRESS, link.link_code.as_str(), price);
    let outcome = api.handle_event(event).await.expect("settlement should succeed");
    let SettlementOutcome::Settled { payment, .. } = outcome else {
        panic!("expected a settled outcome, got {outcome:?}");
    };

    assert_eq!(payment.gross_amount, MicroUsd::from(500_000_000));
    assert_eq!(payment.fee_amount, MicroUsd::from(7_500_000));
    assert_eq!(payment.net_amount, MicroUsd::from(492_500_000));
    assert_eq!(payment.order_id.as_str(), "ord_1");
    assert_eq!(payment.owner_id, "vendor-1");

    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(492_500_000));
    let entries = db.ledger_entries_for_wallet(wallet.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, EntryType::Payment);
    assert_eq!(entries[0].amount, MicroUsd::from(492_500_000));
    assert_eq!(entries[0].reference_id.as_deref(), Some("ord_1"));

    let ledger = LedgerApi::new(db, EventProducers::default());
    ledger.reconcile_wallet(wallet.id).await.expect("wallet should reconcile");
}

#[tokio::test]
async fn redelivered_events_settle_exactly_once() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(500);
    let (wallet, link) = new_vendor(&db, "vendor-1", "Premium plan", price).await;
    let api = settlement_api(db.clone());

    let event = SettlementEvent::completed("ord_1", CUSTODY_ADDRESS, link.link_code.as_str(), price);
    assert!(api.handle_event(event.clone()).await.unwrap().is_settled());
    // The processor redelivers. Same event, no new side effects.
    let redelivered = api.handle_event(event).await.expect("redelivery must not be an error");
    assert!(matches!(redelivered, SettlementOutcome::AlreadySettled(_)));

    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(492_500_000));
    assert_eq!(db.payments_for_owner("vendor-1").await.unwrap().len(), 1);
    assert_eq!(db.ledger_entries_for_wallet(wallet.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn events_for_other_addresses_are_silently_ignored() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(100);
    let (_, link) = new_vendor(&db, "vendor-1", "Sticker pack", price).await;
    let api = settlement_api(db.clone());

    let event = SettlementEvent::completed(
        "ord_elsewhere",
        "0x9999999999999999999999999999999999999999",
        link.link_code.as_str(),
        price,
    );
    let outcome = api.handle_event(event).await.expect("an unrelated transaction is not an error");
    assert!(matches!(outcome, SettlementOutcome::Ignored));
    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(0));
    assert!(db.fetch_payment_by_order_id(&"ord_elsewhere".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn custody_address_matching_ignores_evm_checksum_case() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(10);
    let (_, link) = new_vendor(&db, "vendor-1", "Sticker pack", price).await;
    let api = settlement_api(db.clone());

    // Same custody address, checksummed casing.
    let event = SettlementEvent::completed(
        "ord_2",
        "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B",
        link.link_code.as_str(),
        price,
    );
    assert!(api.handle_event(event).await.unwrap().is_settled());
}

#[tokio::test]
async fn unknown_and_inactive_links_are_rejected() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(10);
    let (_, link) = new_vendor(&db, "vendor-1", "Sticker pack", price).await;
    let api = settlement_api(db.clone());

    let event = SettlementEvent::completed("ord_3", CUSTODY_ADDRESS, "lnk_nonexistent", price);
    let err = api.handle_event(event).await.expect_err("an unknown link must not settle");
    assert!(matches!(err, SettlementError::UnknownPaymentLink(_)));

    db.deactivate_payment_link(&link.link_code).await.unwrap();
    let event = SettlementEvent::completed("ord_4", CUSTODY_ADDRESS, link.link_code.as_str(), price);
    let err = api.handle_event(event).await.expect_err("an inactive link must not settle");
    assert!(matches!(err, SettlementError::UnknownPaymentLink(_)));
    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(0));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let db = new_db().await;
    let (_, link) = new_vendor(&db, "vendor-1", "Sticker pack", MicroUsd::from_dollars(10)).await;
    let api = settlement_api(db.clone());

    let event = SettlementEvent::completed("ord_5", CUSTODY_ADDRESS, link.link_code.as_str(), MicroUsd::from(0));
    let err = api.handle_event(event).await.expect_err("a zero amount must not settle");
    assert!(matches!(err, SettlementError::InvalidAmount(_)));
    assert!(db.fetch_payment_by_order_id(&"ord_5".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn refund_notices_for_unsettled_orders_are_noops() {
    let db = new_db().await;
    let (_, link) = new_vendor(&db, "vendor-1", "Sticker pack", MicroUsd::from_dollars(10)).await;
    let api = settlement_api(db.clone());

    let mut event =
        SettlementEvent::completed("ord_never_seen", CUSTODY_ADDRESS, link.link_code.as_str(), MicroUsd::from_dollars(10));
    event.status = OrderEventStatus::Refunded;
    let outcome = api.handle_event(event).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::NoEffect));
}

#[tokio::test]
async fn refunds_after_credit_are_flagged_for_manual_reversal() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(200);
    let (wallet, link) = new_vendor(&db, "vendor-1", "Consulting", price).await;
    let api = settlement_api(db.clone());

    let event = SettlementEvent::completed("ord_6", CUSTODY_ADDRESS, link.link_code.as_str(), price);
    let settled = api.handle_event(event.clone()).await.unwrap();
    let net = settled.payment().unwrap().net_amount;

    let mut refund = event;
    refund.status = OrderEventStatus::Refunded;
    let outcome = api.handle_event(refund).await.unwrap();
    let SettlementOutcome::ManualReversalRequired(payment) = outcome else {
        panic!("expected a manual-reversal outcome, got {outcome:?}");
    };
    // The engine did not touch the balance on its own.
    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), net);

    // An operator records the compensating adjustment, which reverses the credit.
    let ledger = LedgerApi::new(db.clone(), EventProducers::default());
    ledger
        .record_adjustment(&Actor::operator("ops-1"), wallet.id, -payment.net_amount, "refund of ord_6")
        .await
        .expect("adjustment should apply");
    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(0));
    ledger.reconcile_wallet(wallet.id).await.expect("wallet should reconcile after the reversal");
}

#[tokio::test]
async fn signed_webhooks_settle_end_to_end() {
    let db = new_db().await;
    let (_, link) = new_vendor(&db, "vendor-1", "Premium plan", MicroUsd::from_dollars(500)).await;
    let api = settlement_api(db.clone());

    let secret = Secret::new("webhook-secret".to_string());
    let verifier = HmacVerifier::new(secret, true);
    let payload = format!(
        r#"{{"externalOrderId": "ord_signed", "targetAddress": "{CUSTODY_ADDRESS}", "linkReference": "{}", "amount": 500.00}}"#,
        link.link_code
    );
    let signature = calculate_webhook_hmac("webhook-secret", payload.as_bytes()).unwrap();

    let outcome =
        api.handle_webhook(&verifier, payload.as_bytes(), Some(signature.as_str())).await.expect("webhook should settle");
    assert!(outcome.is_settled());
    assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(492_500_000));

    // A forged signature never reaches the ledger.
    let err = api
        .handle_webhook(&verifier, payload.as_bytes(), Some("deadbeef"))
        .await
        .expect_err("a forged signature must be rejected");
    assert!(matches!(err, SettlementError::Authentication(_)));
}

#[tokio::test]
async fn settlement_completes_within_the_processing_deadline() {
    let db = new_db().await;
    let price = MicroUsd::from_dollars(25);
    let (_, link) = new_vendor(&db, "vendor-1", "Sticker pack", price).await;
    let api = settlement_api(db.clone());

    let event = SettlementEvent::completed("ord_7", CUSTODY_ADDRESS, link.link_code.as_str(), price);
    let outcome = api.handle_event_with_timeout(event, Duration::from_secs(5)).await.unwrap();
    assert!(outcome.is_settled());
}
