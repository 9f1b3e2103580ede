use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{NewWithdrawalRequest, ReviewTier, WithdrawalRequest, WithdrawalStatus};

const REQUEST_COLUMNS: &str =
    "id, owner_id, amount, status, tier, processed_by, payout_order_id, notes, requested_at, processed_at";

pub async fn insert_request(
    request: &NewWithdrawalRequest,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, sqlx::Error> {
    sqlx::query_as::<_, WithdrawalRequest>(&format!(
        r#"
            INSERT INTO withdrawal_requests (owner_id, amount, tier)
            VALUES (?, ?, ?)
            RETURNING {REQUEST_COLUMNS};
        "#
    ))
    .bind(&request.owner_id)
    .bind(request.amount)
    .bind(request.tier)
    .fetch_one(conn)
    .await
}

pub async fn request_by_id(request_id: i64, conn: &mut SqliteConnection) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
    sqlx::query_as::<_, WithdrawalRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM withdrawal_requests WHERE id = ?"
    ))
    .bind(request_id)
    .fetch_optional(conn)
    .await
}

/// Pending requests, oldest first, optionally narrowed to one review tier.
pub async fn pending_requests(
    tier: Option<ReviewTier>,
    conn: &mut SqliteConnection,
) -> Result<Vec<WithdrawalRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {REQUEST_COLUMNS} FROM withdrawal_requests WHERE status = 'Pending'"
    ));
    if let Some(tier) = tier {
        builder.push(" AND tier = ");
        builder.push_bind(tier.to_string());
    }
    builder.push(" ORDER BY requested_at ASC, id ASC");
    trace!("🏧️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<WithdrawalRequest>();
    query.fetch_all(conn).await
}

pub async fn set_payout_order(
    request_id: i64,
    payout_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, sqlx::Error> {
    sqlx::query_as::<_, WithdrawalRequest>(&format!(
        r#"
            UPDATE withdrawal_requests SET payout_order_id = ?
            WHERE id = ?
            RETURNING {REQUEST_COLUMNS};
        "#
    ))
    .bind(payout_order_id)
    .bind(request_id)
    .fetch_one(conn)
    .await
}

/// Moves the request to its terminal state and stamps who processed it and when.
pub async fn mark_processed(
    request_id: i64,
    status: WithdrawalStatus,
    processed_by: &str,
    notes: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<WithdrawalRequest, sqlx::Error> {
    sqlx::query_as::<_, WithdrawalRequest>(&format!(
        r#"
            UPDATE withdrawal_requests SET
                status = ?,
                processed_by = ?,
                notes = ?,
                processed_at = CURRENT_TIMESTAMP
            WHERE id = ?
            RETURNING {REQUEST_COLUMNS};
        "#
    ))
    .bind(status)
    .bind(processed_by)
    .bind(notes)
    .bind(request_id)
    .fetch_one(conn)
    .await
}
