//! Server configuration.
//!
//! Everything comes from environment variables with sensible defaults; a malformed value is logged and replaced
//! with the default rather than aborting startup.
use std::{env, time::Duration};

use bloom_engine::{scheduler::ProgressionRules, CouponFailPolicy};
use log::*;

const DEFAULT_BLOOM_HOST: &str = "127.0.0.1";
const DEFAULT_BLOOM_PORT: u16 = 8480;
const DEFAULT_GUEST_CART_TTL_MINS: u64 = 120;
// The progression dwells are measured in tens of minutes, so a half-hour cadence is plenty.
const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 1800;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How long an untouched guest cart survives before the session sweeper evicts it.
    pub guest_cart_ttl: Duration,
    /// What happens to an applied coupon when re-validation cannot reach the store.
    pub coupon_fail_policy: CouponFailPolicy,
    /// Seconds between status-progression sweeps.
    pub scheduler_interval: Duration,
    /// When true, the server runs without the background scheduler. Sweeps can still be triggered manually via
    /// the admin endpoint.
    pub scheduler_disabled: bool,
    /// Dwell times driving the status progression.
    pub progression: ProgressionRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BLOOM_HOST.to_string(),
            port: DEFAULT_BLOOM_PORT,
            database_url: String::default(),
            guest_cart_ttl: Duration::from_secs(DEFAULT_GUEST_CART_TTL_MINS * 60),
            coupon_fail_policy: CouponFailPolicy::default(),
            scheduler_interval: Duration::from_secs(DEFAULT_SCHEDULER_INTERVAL_SECS),
            scheduler_disabled: false,
            progression: ProgressionRules::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = ServerConfig::default();
        let host = env::var("BLOOM_HOST").ok().unwrap_or(defaults.host);
        let port = env::var("BLOOM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BLOOM_PORT. {e} Using the default, {DEFAULT_BLOOM_PORT}, \
                         instead."
                    );
                    DEFAULT_BLOOM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BLOOM_PORT);
        let database_url = env::var("BLOOM_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BLOOM_DATABASE_URL is not set. Please set it to the URL for the store database.");
            String::default()
        });
        let coupon_fail_policy = env::var("BLOOM_COUPON_FAIL_POLICY")
            .ok()
            .map(|s| {
                s.parse::<CouponFailPolicy>().unwrap_or_else(|e| {
                    warn!("🪛️ {e} Using the default policy.");
                    CouponFailPolicy::default()
                })
            })
            .unwrap_or_default();
        let guest_cart_ttl =
            Duration::from_secs(env_u64("BLOOM_GUEST_CART_TTL_MINS", DEFAULT_GUEST_CART_TTL_MINS) * 60);
        let scheduler_interval =
            Duration::from_secs(env_u64("BLOOM_SCHEDULER_INTERVAL_SECS", DEFAULT_SCHEDULER_INTERVAL_SECS));
        let scheduler_disabled =
            env::var("BLOOM_SCHEDULER_DISABLED").map(|s| &s == "1" || &s == "true").unwrap_or(false);
        let progression = progression_from_env();
        Self {
            host,
            port,
            database_url,
            guest_cart_ttl,
            coupon_fail_policy,
            scheduler_interval,
            scheduler_disabled,
            progression,
        }
    }
}

fn progression_from_env() -> ProgressionRules {
    let defaults = ProgressionRules::default();
    let minutes = |var: &str, default: chrono::Duration| {
        chrono::Duration::minutes(env_u64(var, default.num_minutes().unsigned_abs()) as i64)
    };
    ProgressionRules {
        pending_to_confirmed: minutes("BLOOM_DWELL_PENDING_MINS", defaults.pending_to_confirmed),
        confirmed_to_processing: minutes("BLOOM_DWELL_CONFIRMED_MINS", defaults.confirmed_to_processing),
        processing_to_shipped: minutes("BLOOM_DWELL_PROCESSING_MINS", defaults.processing_to_shipped),
        shipped_to_delivered: minutes("BLOOM_DWELL_SHIPPED_MINS", defaults.shipped_to_delivered),
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    match env::var(var) {
        Ok(s) => s.parse::<u64>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}
