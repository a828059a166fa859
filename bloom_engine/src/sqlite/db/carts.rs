use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::CartState, traits::ShopDatabaseError};

/// The cart state is stored as a JSON document keyed by the owner. Authenticated sessions round-trip through here
/// on every mutation; guest carts never reach this table.
pub async fn load_cart(owner_key: &str, conn: &mut SqliteConnection) -> Result<Option<CartState>, ShopDatabaseError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT state FROM carts WHERE owner = $1").bind(owner_key).fetch_optional(conn).await?;
    match row {
        Some((state,)) => {
            let cart = serde_json::from_str(&state)
                .map_err(|e| ShopDatabaseError::DatabaseError(format!("Stored cart for {owner_key} is unreadable: {e}")))?;
            Ok(Some(cart))
        },
        None => Ok(None),
    }
}

pub async fn save_cart(owner_key: &str, cart: &CartState, conn: &mut SqliteConnection) -> Result<(), ShopDatabaseError> {
    let state = serde_json::to_string(cart)
        .map_err(|e| ShopDatabaseError::DatabaseError(format!("Could not serialize cart: {e}")))?;
    sqlx::query(
        r#"
        INSERT INTO carts (owner, state, updated_at) VALUES ($1, $2, CURRENT_TIMESTAMP)
        ON CONFLICT (owner) DO UPDATE SET state = excluded.state, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(owner_key)
    .bind(state)
    .execute(conn)
    .await?;
    trace!("📝️ Cart saved for {owner_key}");
    Ok(())
}

/// Removes the stored cart. Called from inside the placement transaction.
pub async fn clear_cart(owner_key: &str, conn: &mut SqliteConnection) -> Result<(), ShopDatabaseError> {
    sqlx::query("DELETE FROM carts WHERE owner = $1").bind(owner_key).execute(conn).await?;
    trace!("📝️ Cart cleared for {owner_key}");
    Ok(())
}
