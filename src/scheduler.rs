//! Recurring scheduled indexing runs.
//!
//! Drives the indexer on a fixed interval: wait out the initial delay,
//! then run once per period with a per-run timeout. A failed or timed-out
//! run is logged and the schedule continues; runs never overlap within a
//! process because the loop awaits each run to completion.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::ScheduleConfig;
use crate::indexer::GleanIndexer;

pub async fn run_scheduler(schedule: ScheduleConfig, indexer: Arc<GleanIndexer>) {
    tokio::time::sleep(schedule.initial_delay()).await;

    let mut interval = tokio::time::interval(schedule.frequency());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        info!("scheduled bulk index run starting");
        match tokio::time::timeout(schedule.timeout(), indexer.bulk_index()).await {
            Ok(Ok(())) => info!("scheduled bulk index run finished"),
            Ok(Err(err)) => error!("scheduled bulk index run failed: {err:#}"),
            Err(_) => error!(
                "scheduled bulk index run timed out after {}m",
                schedule.timeout_minutes
            ),
        }
    }
}
