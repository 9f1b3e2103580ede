use sqlx::SqliteConnection;

use crate::db_types::{NewPayment, OrderId, Payment};

const PAYMENT_COLUMNS: &str =
    "id, order_id, owner_id, link_code, gross_amount, fee_amount, net_amount, status, description, created_at";

/// Inserts the payment row for a settled order. Returns `None` when a payment for the order id
/// already exists — the UNIQUE constraint on `order_id` decides, even between concurrent deliveries.
pub async fn insert_payment(payment: &NewPayment, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let result = sqlx::query_as::<_, Payment>(&format!(
        r#"
            INSERT INTO payments (
                order_id,
                owner_id,
                link_code,
                gross_amount,
                fee_amount,
                net_amount,
                description
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {PAYMENT_COLUMNS};
        "#
    ))
    .bind(&payment.order_id)
    .bind(&payment.owner_id)
    .bind(&payment.link_code)
    .bind(payment.gross_amount)
    .bind(payment.fee_amount)
    .bind(payment.net_amount)
    .bind(payment.description.as_deref())
    .fetch_one(conn)
    .await;
    match result {
        Ok(payment) => Ok(Some(payment)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn payment_by_order_id(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?"))
        .bind(order_id)
        .fetch_optional(conn)
        .await
}

pub async fn payments_for_owner(owner_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE owner_id = ? ORDER BY id DESC"
    ))
    .bind(owner_id)
    .fetch_all(conn)
    .await
}

/// Payments with no matching `Payment` ledger entry. A settlement that recorded its payment but died
/// before crediting leaves exactly this trace.
pub async fn orphaned_payments(conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(&format!(
        r#"
        SELECT {PAYMENT_COLUMNS} FROM payments
        WHERE NOT EXISTS (
            SELECT 1 FROM ledger_entries
            WHERE ledger_entries.entry_type = 'Payment'
              AND ledger_entries.reference_id = payments.order_id
        )
        ORDER BY id ASC
        "#
    ))
    .fetch_all(conn)
    .await
}
