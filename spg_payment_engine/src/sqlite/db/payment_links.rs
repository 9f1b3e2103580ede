use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentLink, PaymentLink},
    traits::LedgerError,
};

const LINK_COLUMNS: &str = "id, link_code, owner_id, product_name, amount, active, created_at";

pub async fn insert_link(link: &NewPaymentLink, conn: &mut SqliteConnection) -> Result<PaymentLink, LedgerError> {
    let result = sqlx::query_as::<_, PaymentLink>(&format!(
        r#"
            INSERT INTO payment_links (link_code, owner_id, product_name, amount)
            VALUES (?, ?, ?, ?)
            RETURNING {LINK_COLUMNS};
        "#
    ))
    .bind(&link.link_code)
    .bind(&link.owner_id)
    .bind(&link.product_name)
    .bind(link.amount)
    .fetch_one(conn)
    .await;
    match result {
        Ok(link) => Ok(link),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(LedgerError::PaymentLinkAlreadyExists(link.link_code.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn link_by_code(link_code: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentLink>, sqlx::Error> {
    sqlx::query_as::<_, PaymentLink>(&format!("SELECT {LINK_COLUMNS} FROM payment_links WHERE link_code = ?"))
        .bind(link_code)
        .fetch_optional(conn)
        .await
}

pub async fn deactivate_link(link_code: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let result = sqlx::query("UPDATE payment_links SET active = 0 WHERE link_code = ?")
        .bind(link_code)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        debug!("🔗️ No payment link with code {link_code} to deactivate. Request skipped.");
    }
    Ok(())
}
