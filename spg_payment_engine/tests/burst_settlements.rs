use futures_util::future::join_all;
use log::*;
use spg_common::MicroUsd;
use spg_payment_engine::{
    db_types::{Actor, EntryType, NewLedgerEntry},
    events::EventProducers,
    fees::FeeSchedule,
    processor_types::SettlementEvent,
    traits::{LedgerDatabase, WalletManagement},
    LedgerApi,
    SettlementApi,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

use crate::support::{new_vendor, prepare_env::{prepare_test_env, random_db_path}, CUSTODY_ADDRESS};

mod support;

const NUM_CREDITS: i64 = 20;

#[test]
fn concurrent_credits_lose_no_updates() {
    info!("🚀️ Starting concurrent credit test");

    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let wallet = db.create_wallet("vendor-1").await.expect("Error creating wallet");

        let amount = MicroUsd::from_dollars(3);
        let tasks = (0..NUM_CREDITS).map(|_| {
            let api = LedgerApi::new(db.clone(), EventProducers::default());
            tokio::spawn(async move {
                let entry = NewLedgerEntry::new(amount, EntryType::Adjustment);
                api.credit(&Actor::System, wallet.id, entry).await
            })
        });
        for result in join_all(tasks).await {
            result.expect("credit task panicked").expect("Error crediting wallet");
        }

        assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), amount * NUM_CREDITS);
        assert_eq!(db.ledger_entries_for_wallet(wallet.id).await.unwrap().len(), NUM_CREDITS as usize);
        let api = LedgerApi::new(db, EventProducers::default());
        api.reconcile_wallet(wallet.id).await.expect("wallet should reconcile after the burst");
    });
    info!("🚀️ test complete");
}

#[test]
fn racing_duplicate_deliveries_credit_exactly_once() {
    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let price = MicroUsd::from_dollars(500);
        let (wallet, link) = new_vendor(&db, "vendor-1", "Premium plan", price).await;

        // The same webhook delivered to several request handlers at once.
        let tasks = (0..4).map(|_| {
            let api = SettlementApi::new(
                db.clone(),
                CUSTODY_ADDRESS,
                FeeSchedule::default(),
                EventProducers::default(),
            );
            let event = SettlementEvent::completed("ord_raced", CUSTODY_ADDRESS, link.link_code.as_str(), price);
            tokio::spawn(async move { api.handle_event(event).await })
        });
        let outcomes = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.expect("settlement task panicked").expect("Error settling order"))
            .collect::<Vec<_>>();

        let settled = outcomes.iter().filter(|o| o.is_settled()).count();
        assert_eq!(settled, 1, "exactly one delivery may win the race");

        assert_eq!(db.balance_for_owner("vendor-1").await.unwrap(), MicroUsd::from(492_500_000));
        assert_eq!(db.payments_for_owner("vendor-1").await.unwrap().len(), 1);
        assert_eq!(db.ledger_entries_for_wallet(wallet.id).await.unwrap().len(), 1);
    });
}
