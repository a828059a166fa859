pub mod cart_api;
pub mod coupon_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
