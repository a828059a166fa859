use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Address, NewAddress},
    traits::ShopDatabaseError,
};

/// Inserts an address for the owner. When the new address is flagged default, the previous default for the same
/// owner is cleared first; both statements run on the caller's connection, which should be a transaction.
pub async fn insert_address(
    owner_key: &str,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Address, ShopDatabaseError> {
    if address.is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE owner = $1 AND is_default = TRUE")
            .bind(owner_key)
            .execute(&mut *conn)
            .await?;
    }
    let inserted: Address = sqlx::query_as(
        r#"
        INSERT INTO addresses (owner, recipient, phone, line1, line2, city, postcode, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(owner_key)
    .bind(address.recipient)
    .bind(address.phone)
    .bind(address.line1)
    .bind(address.line2)
    .bind(address.city)
    .bind(address.postcode)
    .bind(address.is_default)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Address {} stored for {owner_key}", inserted.id);
    Ok(inserted)
}

pub async fn fetch_address(
    address_id: i64,
    owner_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    let address = sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND owner = $2")
        .bind(address_id)
        .bind(owner_key)
        .fetch_optional(conn)
        .await?;
    Ok(address)
}

pub async fn fetch_addresses(owner_key: &str, conn: &mut SqliteConnection) -> Result<Vec<Address>, sqlx::Error> {
    let addresses =
        sqlx::query_as("SELECT * FROM addresses WHERE owner = $1 ORDER BY is_default DESC, created_at DESC")
            .bind(owner_key)
            .fetch_all(conn)
            .await?;
    Ok(addresses)
}
