use super::{JobContext, ETHEREUM_ROLE_CONSENSUS};
use crate::metrics::{
    SYNC_DISTANCE, SYNC_ESTIMATED_HIGHEST_SLOT, SYNC_HEAD_SLOT, SYNC_IS_SYNCING, SYNC_PERCENTAGE,
};
use crate::topics::{Event, Topic};
use metrics::set_gauge_vec;
use slog::warn;
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

const TICK_INTERVAL: Duration = Duration::from_secs(15);

/// Polls `/eth/v1/node/syncing` on its own cadence and republishes the
/// result as `Topic::SyncStatus`, the same "poll upstream, put it on the
/// bus, record it" shape `spec_job`'s `refetch` uses (spec.md §4.8:
/// "Subscribes to: node_syncing").
pub async fn run_sync_job(ctx: Arc<JobContext>, executor: TaskExecutor) {
    let sub_ctx = ctx.clone();
    ctx.bus.subscribe(Topic::SyncStatus, move |event| {
        if let Event::SyncStatus(status) = event {
            record(&sub_ctx, status);
        }
        Ok(())
    });

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => tick(&ctx).await,
        }
    }
}

async fn tick(ctx: &JobContext) {
    match ctx.beacon_client.get_node_syncing().await {
        Ok(status) => ctx.bus.publish(Topic::SyncStatus, Event::SyncStatus(status)),
        Err(e) => warn!(ctx.log, "sync job: failed to fetch node syncing status"; "error" => %e),
    }
}

fn record(ctx: &JobContext, status: &eth2_client::SyncingData) {
    let head_slot = status.head_slot.as_u64() as i64;
    let distance = status.sync_distance as i64;
    let labels = [ctx.node_name.as_str(), ETHEREUM_ROLE_CONSENSUS];
    set_gauge_vec(&SYNC_HEAD_SLOT, &labels, head_slot);
    set_gauge_vec(&SYNC_DISTANCE, &labels, distance);
    set_gauge_vec(&SYNC_IS_SYNCING, &labels, if status.is_syncing { 1 } else { 0 });
    set_gauge_vec(&SYNC_ESTIMATED_HIGHEST_SLOT, &labels, head_slot + distance);

    let total = head_slot + distance;
    let percentage = if total > 0 { (head_slot * 100) / total } else { 100 };
    set_gauge_vec(&SYNC_PERCENTAGE, &labels, percentage);
}
