//! `SqliteDatabase` is the concrete implementation of the Bloom order engine backend.
//!
//! Unsurprisingly, it uses SQLite and implements the [`ShopDatabase`] trait. It is the only conforming
//! implementation; the trait exists so that tests can supply a double.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use super::db::{addresses, carts, catalog, coupons, db_url, new_pool, orders, run_migrations};
use crate::{
    db_types::{
        Address,
        CartState,
        Coupon,
        DeliveryOption,
        NewAddress,
        NewOrder,
        Order,
        OrderNo,
        OrderStatusType,
        Product,
    },
    traits::{ShopDatabase, ShopDatabaseError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl ShopDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_delivery_option(&self, option_id: i64) -> Result<Option<DeliveryOption>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let option = catalog::fetch_delivery_option(option_id, &mut conn).await?;
        Ok(option)
    }

    async fn fetch_delivery_options(&self) -> Result<Vec<DeliveryOption>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let options = catalog::fetch_delivery_options(&mut conn).await?;
        Ok(options)
    }

    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let coupon = coupons::fetch_coupon_by_code(code, &mut conn).await?;
        Ok(coupon)
    }

    async fn load_cart(&self, owner_key: &str) -> Result<Option<CartState>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        carts::load_cart(owner_key, &mut conn).await
    }

    async fn save_cart(&self, owner_key: &str, cart: &CartState) -> Result<(), ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        carts::save_cart(owner_key, cart, &mut conn).await
    }

    async fn insert_address(&self, owner_key: &str, address: NewAddress) -> Result<Address, ShopDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let address = addresses::insert_address(owner_key, address, &mut tx).await?;
        tx.commit().await?;
        Ok(address)
    }

    async fn fetch_address(&self, address_id: i64, owner_key: &str) -> Result<Option<Address>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let address = addresses::fetch_address(address_id, owner_key, &mut conn).await?;
        Ok(address)
    }

    async fn fetch_addresses(&self, owner_key: &str) -> Result<Vec<Address>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let result = addresses::fetch_addresses(owner_key, &mut conn).await?;
        Ok(result)
    }

    /// The one strict atomicity boundary in the pipeline: the order insert, the coupon usage increment and the
    /// cart clear commit together or not at all.
    async fn place_order(
        &self,
        order: NewOrder,
        owner_key: &str,
        coupon_id: Option<i64>,
    ) -> Result<Order, ShopDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        if let Some(id) = coupon_id {
            coupons::increment_usage(id, &mut tx).await?;
        }
        carts::clear_cart(owner_key, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} persisted for {owner_key}. Total {}", order.order_no, order.total);
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_no: &OrderNo) -> Result<Option<Order>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_no, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_in_status_older_than(
        &self,
        status: OrderStatusType,
        min_age: Duration,
    ) -> Result<Vec<Order>, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_stale_orders(status, min_age, &mut conn).await?;
        Ok(result)
    }

    async fn advance_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Order, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::advance_status(order_id, from, to, &mut conn).await?;
        trace!("🗃️ Order {} moved {from} → {to}", order.order_no);
        Ok(order)
    }

    async fn cancel_order(&self, order_no: &OrderNo) -> Result<Order, ShopDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::cancel_order(order_no, &mut conn).await?;
        debug!("🗃️ Order {order_no} cancelled");
        Ok(order)
    }

    async fn close(&mut self) -> Result<(), ShopDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        run_migrations(&pool).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
