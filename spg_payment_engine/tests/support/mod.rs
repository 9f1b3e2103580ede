pub mod prepare_env;

use spg_common::MicroUsd;
use spg_payment_engine::{
    db_types::{NewPaymentLink, PaymentLink, Wallet},
    traits::LedgerDatabase,
    SqliteDatabase,
};

pub const CUSTODY_ADDRESS: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";

/// Creates a wallet and an active payment link for a vendor, the fixture almost every flow needs.
pub async fn new_vendor(db: &SqliteDatabase, owner_id: &str, product: &str, price: MicroUsd) -> (Wallet, PaymentLink) {
    let wallet = db.create_wallet(owner_id).await.expect("Error creating wallet");
    let link = db
        .create_payment_link(NewPaymentLink::new(owner_id, product, price))
        .await
        .expect("Error creating payment link");
    (wallet, link)
}
