use bloom_engine::{
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
use mockall::mock;

mock! {
    pub ShopDb {}

    impl Clone for ShopDb {
        fn clone(&self) -> Self;
    }

    impl ShopDatabase for ShopDb {
        fn url(&self) -> &str;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, ShopDatabaseError>;
        async fn fetch_delivery_option(&self, option_id: i64) -> Result<Option<DeliveryOption>, ShopDatabaseError>;
        async fn fetch_delivery_options(&self) -> Result<Vec<DeliveryOption>, ShopDatabaseError>;
        async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, ShopDatabaseError>;
        async fn load_cart(&self, owner_key: &str) -> Result<Option<CartState>, ShopDatabaseError>;
        async fn save_cart(&self, owner_key: &str, cart: &CartState) -> Result<(), ShopDatabaseError>;
        async fn insert_address(&self, owner_key: &str, address: NewAddress) -> Result<Address, ShopDatabaseError>;
        async fn fetch_address(&self, address_id: i64, owner_key: &str) -> Result<Option<Address>, ShopDatabaseError>;
        async fn fetch_addresses(&self, owner_key: &str) -> Result<Vec<Address>, ShopDatabaseError>;
        async fn place_order(&self, order: NewOrder, owner_key: &str, coupon_id: Option<i64>) -> Result<Order, ShopDatabaseError>;
        async fn fetch_order_by_number(&self, order_no: &OrderNo) -> Result<Option<Order>, ShopDatabaseError>;
        async fn fetch_orders_in_status_older_than(&self, status: OrderStatusType, min_age: chrono::Duration) -> Result<Vec<Order>, ShopDatabaseError>;
        async fn advance_order_status(&self, order_id: i64, from: OrderStatusType, to: OrderStatusType) -> Result<Order, ShopDatabaseError>;
        async fn cancel_order(&self, order_no: &OrderNo) -> Result<Order, ShopDatabaseError>;
        async fn close(&mut self) -> Result<(), ShopDatabaseError>;
    }
}

/// A fresh mock with no expectations except that it can be cloned, to any depth.
fn inert() -> MockShopDb {
    let mut db = MockShopDb::new();
    db.expect_clone().returning(inert);
    db
}

/// A mock whose clones are inert mocks that can themselves be cloned freely. The engine APIs clone the backend
/// on construction for their internal coupon validator; tests that never touch the validator can use this and
/// put their expectations on the outer mock.
pub fn mock_with_inert_clones() -> MockShopDb {
    let mut db = MockShopDb::new();
    db.expect_clone().returning(inert);
    db
}
