//! The status progression scheduler.
//!
//! A background task sweeps the order store on a fixed interval and advances any order that has dwelt in its
//! current status long enough. Each sweep is guarded against overlap: if a tick fires while the previous sweep is
//! still running, the new tick is skipped and logged rather than queued. One bad order never aborts a sweep; the
//! failure is logged and the sweep moves on.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Notify, RwLock},
    task::JoinHandle,
};

use crate::{
    db_types::OrderStatusType,
    events::EventProducers,
    shop_api::order_flow_api::OrderFlowApi,
    traits::ShopDatabase,
};

/// How long an order must sit in each status before the scheduler moves it on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionRules {
    pub pending_to_confirmed: chrono::Duration,
    pub confirmed_to_processing: chrono::Duration,
    pub processing_to_shipped: chrono::Duration,
    pub shipped_to_delivered: chrono::Duration,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            pending_to_confirmed: chrono::Duration::minutes(30),
            confirmed_to_processing: chrono::Duration::minutes(60),
            processing_to_shipped: chrono::Duration::minutes(120),
            shipped_to_delivered: chrono::Duration::minutes(60),
        }
    }
}

impl ProgressionRules {
    /// The dwell time for leaving `status`, or `None` for terminal states.
    pub fn dwell_for(&self, status: OrderStatusType) -> Option<chrono::Duration> {
        match status {
            OrderStatusType::Pending => Some(self.pending_to_confirmed),
            OrderStatusType::Confirmed => Some(self.confirmed_to_processing),
            OrderStatusType::Processing => Some(self.processing_to_shipped),
            OrderStatusType::Shipped => Some(self.shipped_to_delivered),
            OrderStatusType::Delivered | OrderStatusType::Cancelled => None,
        }
    }
}

/// The outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub advanced: usize,
    pub errors: usize,
}

/// Introspection snapshot for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub sweep_in_progress: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_result: Option<TickSummary>,
}

#[derive(Clone)]
pub struct StatusScheduler<B> {
    flow: OrderFlowApi<B>,
    db: B,
    rules: ProgressionRules,
    running: Arc<AtomicBool>,
    sweep_in_progress: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    loop_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    last: Arc<RwLock<(Option<DateTime<Utc>>, Option<TickSummary>)>>,
}

impl<B> StatusScheduler<B>
where B: ShopDatabase
{
    pub fn new(db: B, producers: EventProducers, rules: ProgressionRules) -> Self {
        let flow = OrderFlowApi::new(db.clone(), producers);
        Self {
            flow,
            db,
            rules,
            running: Arc::new(AtomicBool::new(false)),
            sweep_in_progress: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            loop_handle: Arc::new(Mutex::new(None)),
            last: Arc::new(RwLock::new((None, None))),
        }
    }

    /// Stops the sweep loop. A sweep that is mid-flight finishes, but no further sweep starts, not even at the
    /// next tick. Returns the loop's handle so callers can await the drain.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        info!("🕰️ Status scheduler stopping");
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
        self.loop_handle.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Runs one sweep now, unless one is already in flight, in which case the call is skipped. Returns the sweep
    /// summary, or `None` when skipped.
    pub async fn trigger_once(&self) -> Option<TickSummary> {
        if self.sweep_in_progress.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            warn!("🕰️ A sweep is already in progress. Skipping this tick.");
            return None;
        }
        let summary = self.sweep().await;
        *self.last.write().await = (Some(Utc::now()), Some(summary));
        self.sweep_in_progress.store(false, Ordering::SeqCst);
        Some(summary)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let (last_run, last_result) = *self.last.read().await;
        SchedulerStatus {
            running: self.running.load(Ordering::SeqCst),
            sweep_in_progress: self.sweep_in_progress.load(Ordering::SeqCst),
            last_run,
            last_result,
        }
    }

    async fn sweep(&self) -> TickSummary {
        trace!("🕰️ Sweep starting");
        let mut summary = TickSummary::default();
        for status in OrderStatusType::progression() {
            let Some(dwell) = self.rules.dwell_for(status) else {
                continue;
            };
            let stale = match self.db.fetch_orders_in_status_older_than(status, dwell).await {
                Ok(orders) => orders,
                Err(e) => {
                    error!("🕰️ Could not query {status} orders: {e}");
                    summary.errors += 1;
                    continue;
                },
            };
            for order in stale {
                match self.flow.advance_order(&order).await {
                    Ok(Some(updated)) => {
                        info!("🕰️ Order {} advanced {status} → {}", updated.order_no, updated.status);
                        summary.advanced += 1;
                    },
                    // Someone else moved it first. Nothing to do.
                    Ok(None) => {},
                    Err(e) => {
                        error!("🕰️ Could not advance order {}: {e}", order.order_no);
                        summary.errors += 1;
                    },
                }
            }
        }
        if summary.advanced > 0 || summary.errors > 0 {
            debug!("🕰️ Sweep complete. Advanced {}, errors {}", summary.advanced, summary.errors);
        }
        summary
    }
}

#[cfg(feature = "sqlite")]
impl StatusScheduler<crate::SqliteDatabase> {
    /// Starts the periodic sweep loop. The first sweep runs immediately. The scheduler owns the spawned loop;
    /// [`Self::stop`] ends it without waiting for the next tick.
    pub fn start(&self, interval: Duration) {
        self.running.store(true, Ordering::SeqCst);
        let this = self.clone();
        info!("🕰️ Status scheduler starting. Sweeping every {}s", interval.as_secs());
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if !this.running.load(Ordering::SeqCst) {
                            break;
                        }
                        this.trigger_once().await;
                    },
                    _ = this.shutdown.notified() => break,
                }
            }
            debug!("🕰️ Status scheduler loop exited");
        });
        if let Ok(mut slot) = self.loop_handle.lock() {
            *slot = Some(handle);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_dwell_times() {
        let rules = ProgressionRules::default();
        assert_eq!(rules.dwell_for(OrderStatusType::Pending), Some(chrono::Duration::minutes(30)));
        assert_eq!(rules.dwell_for(OrderStatusType::Shipped), Some(chrono::Duration::minutes(60)));
        assert_eq!(rules.dwell_for(OrderStatusType::Delivered), None);
        assert_eq!(rules.dwell_for(OrderStatusType::Cancelled), None);
    }
}
