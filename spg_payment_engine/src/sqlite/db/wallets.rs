use log::trace;
use spg_common::{MicroUsd, USDC_CURRENCY_CODE};
use sqlx::SqliteConnection;

use crate::{db_types::Wallet, traits::LedgerError};

const WALLET_COLUMNS: &str = "id, owner_id, balance, currency, created_at, updated_at";

pub async fn insert_wallet(owner_id: &str, conn: &mut SqliteConnection) -> Result<Wallet, LedgerError> {
    let result = sqlx::query_as::<_, Wallet>(&format!(
        "INSERT INTO wallets (owner_id, currency) VALUES (?, ?) RETURNING {WALLET_COLUMNS}"
    ))
    .bind(owner_id)
    .bind(USDC_CURRENCY_CODE)
    .fetch_one(conn)
    .await;
    match result {
        Ok(wallet) => {
            trace!("🧑️ Created wallet #{} for owner {owner_id}", wallet.id);
            Ok(wallet)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerError::WalletAlreadyExists(owner_id.to_string()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn wallet_by_id(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as::<_, Wallet>(&format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = ?"))
        .bind(wallet_id)
        .fetch_optional(conn)
        .await
}

pub async fn wallet_for_owner(owner_id: &str, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as::<_, Wallet>(&format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE owner_id = ?"))
        .bind(owner_id)
        .fetch_optional(conn)
        .await
}

/// Applies a balance delta, evaluated by the store itself. Never read-modify-write in application
/// code; concurrent deltas on the same wallet serialize in the database.
pub async fn adjust_balance(wallet_id: i64, delta: MicroUsd, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query(
        r#"UPDATE wallets SET
       balance = balance + ?,
       updated_at = CURRENT_TIMESTAMP
       WHERE id = ?
       "#,
    )
    .bind(delta)
    .bind(wallet_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::WalletNotFound(wallet_id));
    }
    Ok(())
}

/// Decrements the balance only if it covers the amount, in one store-evaluated statement. Returns
/// whether the debit was applied.
pub async fn guarded_debit(wallet_id: i64, amount: MicroUsd, conn: &mut SqliteConnection) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"UPDATE wallets SET
       balance = balance - ?1,
       updated_at = CURRENT_TIMESTAMP
       WHERE id = ?2 AND balance >= ?1
       "#,
    )
    .bind(amount)
    .bind(wallet_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn all_wallet_ids(conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM wallets ORDER BY id").fetch_all(conn).await
}
