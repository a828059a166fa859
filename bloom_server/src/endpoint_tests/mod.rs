mod carts;
mod coupons;
mod helpers;
mod misc;
mod mocks;
mod orders;
mod scheduler;
