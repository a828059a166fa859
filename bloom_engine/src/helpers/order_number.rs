use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::OrderNo;

/// Generates a human-readable order number of the form `BLM-YYYYMMDD-XXXXXX`.
///
/// The random suffix makes collisions vanishingly unlikely; the unique index on the orders table is the actual
/// guarantee, and the placement transaction retries on the (theoretical) conflict.
pub fn new_order_number() -> OrderNo {
    let date = Utc::now().format("%Y%m%d");
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(6).map(char::from).collect::<String>().to_uppercase();
    OrderNo(format!("BLM-{date}-{suffix}"))
}
