use sqlx::SqliteConnection;

use crate::db_types::{DeliveryOption, Product};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_delivery_option(
    option_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryOption>, sqlx::Error> {
    let option =
        sqlx::query_as("SELECT * FROM delivery_options WHERE id = $1").bind(option_id).fetch_optional(conn).await?;
    Ok(option)
}

pub async fn fetch_delivery_options(conn: &mut SqliteConnection) -> Result<Vec<DeliveryOption>, sqlx::Error> {
    let options = sqlx::query_as("SELECT * FROM delivery_options WHERE is_active = TRUE ORDER BY sort_order ASC")
        .fetch_all(conn)
        .await?;
    Ok(options)
}

/// Seeding helper used by the test fixtures.
pub async fn insert_product(product: &Product, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO products (name, unit_price, stock, is_active) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&product.name)
    .bind(product.unit_price)
    .bind(product.stock)
    .bind(product.is_active)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Seeding helper used by the test fixtures.
pub async fn insert_delivery_option(option: &DeliveryOption, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO delivery_options (name, estimate, price, delivery_days, is_active, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&option.name)
    .bind(&option.estimate)
    .bind(option.price)
    .bind(option.delivery_days)
    .bind(option.is_active)
    .bind(option.sort_order)
    .fetch_one(conn)
    .await?;
    Ok(id)
}
