use spg_common::MicroUsd;
use sqlx::SqliteConnection;

use crate::db_types::{LedgerEntry, NewLedgerEntry};

const ENTRY_COLUMNS: &str = "id, wallet_id, amount, entry_type, reference_id, metadata, created_at";

/// Inserts one ledger entry with the given signed amount. This is not atomic on its own; callers
/// embed it in the transaction that also applies the balance delta.
pub async fn insert_entry(
    wallet_id: i64,
    signed_amount: MicroUsd,
    entry: &NewLedgerEntry,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO ledger_entries (
                wallet_id,
                amount,
                entry_type,
                reference_id,
                metadata
            ) VALUES (?, ?, ?, ?, ?)
            RETURNING id;
        "#,
    )
    .bind(wallet_id)
    .bind(signed_amount)
    .bind(entry.entry_type)
    .bind(entry.reference_id.as_deref())
    .bind(entry.metadata.as_deref())
    .fetch_one(conn)
    .await
}

/// All entries for the wallet, oldest first. The statement view: summing the amounts reproduces the
/// wallet balance.
pub async fn entries_for_wallet(wallet_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE wallet_id = ? ORDER BY id ASC"
    ))
    .bind(wallet_id)
    .fetch_all(conn)
    .await
}

/// Recomputes the signed sum of all entries for the wallet, in the store.
pub async fn sum_for_wallet(wallet_id: i64, conn: &mut SqliteConnection) -> Result<MicroUsd, sqlx::Error> {
    let sum = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(amount), 0) FROM ledger_entries WHERE wallet_id = ?",
    )
    .bind(wallet_id)
    .fetch_one(conn)
    .await?;
    Ok(MicroUsd::from(sum))
}
