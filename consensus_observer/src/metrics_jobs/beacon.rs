use super::{JobContext, ETHEREUM_ROLE_CONSENSUS};
use crate::metrics::{
    fnv1a_shard, BEACON_ATTESTATIONS, BEACON_DEPOSITS, BEACON_SLOT, BEACON_TRANSACTIONS,
    BEACON_VOLUNTARY_EXITS, EMPTY_SLOTS_COUNT, FINALITY_CHECKPOINT_HASH, HEAD_SLOT_HASH,
    PROPOSER_DELAY,
};
use crate::topics::{Event, Topic, TimedBlock};
use eth2_client::BlockId;
use metrics::{inc_counter_vec, observe_histogram, set_gauge_vec};
use parking_lot::Mutex;
use slog::warn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use task_executor::TaskExecutor;

const IDLE_TICK: Duration = Duration::from_secs(5);

/// Tracks the last fork-version label seen per `block_id`, so a fork switch
/// can drop the previous version's now-stale series (spec.md §4.8's
/// "block-body shape handling").
struct SeenVersions(Mutex<HashMap<&'static str, String>>);

impl SeenVersions {
    fn new() -> Self {
        Self(Mutex::new(HashMap::new()))
    }

    /// Returns the version to evict, if `block_id` has switched fork since
    /// last observed.
    fn record(&self, block_id: &'static str, version: &str) -> Option<String> {
        let mut seen = self.0.lock();
        match seen.insert(block_id, version.to_string()) {
            Some(previous) if previous != version => Some(previous),
            _ => None,
        }
    }
}

pub async fn run_beacon_job(ctx: Arc<JobContext>, executor: TaskExecutor) {
    let seen = Arc::new(SeenVersions::new());
    subscribe(&ctx, &seen, &executor);

    let mut interval = tokio::time::interval(IDLE_TICK);
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => refresh(&ctx, &seen).await,
        }
    }
}

fn subscribe(ctx: &Arc<JobContext>, seen: &Arc<SeenVersions>, executor: &TaskExecutor) {
    let block_ctx = ctx.clone();
    let block_seen = seen.clone();
    ctx.bus.subscribe(Topic::BlockInserted, move |event| {
        if let Event::BlockInserted(timed) = event {
            record_block(&block_ctx, &block_seen, "head", timed);
        }
        Ok(())
    });

    let empty_ctx = ctx.clone();
    ctx.bus.subscribe(Topic::EmptySlot, move |_event| {
        inc_counter_vec(&EMPTY_SLOTS_COUNT, &[&empty_ctx.node_name, ETHEREUM_ROLE_CONSENSUS]);
        Ok(())
    });

    let finality_ctx = ctx.clone();
    ctx.bus.subscribe(Topic::FinalizedCheckpoint, move |event| {
        if let Event::FinalizedCheckpoint(checkpoint) = event {
            set_gauge_vec(
                &FINALITY_CHECKPOINT_HASH,
                &[&finality_ctx.node_name, ETHEREUM_ROLE_CONSENSUS, "finalized", "block"],
                fnv1a_shard(&checkpoint.block.0),
            );
            set_gauge_vec(
                &FINALITY_CHECKPOINT_HASH,
                &[&finality_ctx.node_name, ETHEREUM_ROLE_CONSENSUS, "finalized", "state"],
                fnv1a_shard(&checkpoint.state.0),
            );
        }
        Ok(())
    });

    // A reorg invalidates whatever this job last recorded for "head" — the
    // SSE block stream will eventually catch up, but re-fetching here closes
    // the gap immediately instead of leaving stale head series in place
    // until the next block event.
    let reorg_ctx = ctx.clone();
    let reorg_seen = seen.clone();
    let reorg_handle = executor.handle().clone();
    ctx.bus.subscribe(Topic::ChainReorg, move |_event| {
        let ctx = reorg_ctx.clone();
        let seen = reorg_seen.clone();
        reorg_handle.spawn(async move {
            if let Ok(Some(block)) = ctx.beacon_client.get_beacon_block(BlockId::Head).await {
                let timed = TimedBlock {
                    block,
                    seen_at: std::time::SystemTime::now(),
                };
                record_block(&ctx, &seen, "head", &timed);
            }
        });
        Ok(())
    });
}

fn record_block(ctx: &JobContext, seen: &SeenVersions, block_id: &'static str, timed: &TimedBlock) {
    let version = timed.block.version.as_str();
    let labels = [&ctx.node_name as &str, ETHEREUM_ROLE_CONSENSUS, block_id, version];

    if let Some(stale_version) = seen.record(block_id, version) {
        evict_stale_series(ctx, block_id, &stale_version);
    }

    set_gauge_vec(&BEACON_SLOT, &labels, timed.block.slot.as_u64() as i64);
    set_gauge_vec(
        &BEACON_ATTESTATIONS,
        &labels,
        timed.block.body.attestations.len() as i64,
    );
    set_gauge_vec(&BEACON_DEPOSITS, &labels, timed.block.body.deposits.len() as i64);
    set_gauge_vec(
        &BEACON_VOLUNTARY_EXITS,
        &labels,
        timed.block.body.voluntary_exits.len() as i64,
    );
    if let Some(transactions) = &timed.block.body.transactions {
        set_gauge_vec(&BEACON_TRANSACTIONS, &labels, transactions.len() as i64);
    }

    if block_id == "head" {
        set_gauge_vec(
            &HEAD_SLOT_HASH,
            &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS],
            fnv1a_shard(&timed.block.state_root.0),
        );

        let expected = UNIX_EPOCH
            + Duration::from_secs(ctx.state.genesis_time())
            + ctx
                .state
                .seconds_per_slot()
                .saturating_mul(timed.block.slot.as_u64() as u32);
        if let Ok(delay) = timed.seen_at.duration_since(expected) {
            observe_histogram(&PROPOSER_DELAY, delay.as_millis() as f64);
        }
    }
}

fn evict_stale_series(ctx: &JobContext, block_id: &str, stale_version: &str) {
    let labels = [ctx.node_name.as_str(), ETHEREUM_ROLE_CONSENSUS, block_id, stale_version];
    if let Ok(metric) = BEACON_SLOT.as_ref() {
        let _ = metric.remove_label_values(&labels);
    }
    if let Ok(metric) = BEACON_ATTESTATIONS.as_ref() {
        let _ = metric.remove_label_values(&labels);
    }
    if let Ok(metric) = BEACON_DEPOSITS.as_ref() {
        let _ = metric.remove_label_values(&labels);
    }
    if let Ok(metric) = BEACON_VOLUNTARY_EXITS.as_ref() {
        let _ = metric.remove_label_values(&labels);
    }
    if let Ok(metric) = BEACON_TRANSACTIONS.as_ref() {
        let _ = metric.remove_label_values(&labels);
    }
}

/// Guards against the finalized/justified block-body gauges going stale
/// between SSE events, by re-fetching those two block identifiers directly.
async fn refresh(ctx: &JobContext, seen: &Arc<SeenVersions>) {
    for (block_id, id) in [("finalized", BlockId::Finalized), ("justified", BlockId::Justified)] {
        match ctx.beacon_client.get_beacon_block(id).await {
            Ok(Some(block)) => {
                let timed = TimedBlock {
                    block,
                    seen_at: std::time::SystemTime::now(),
                };
                record_block(ctx, seen, block_id, &timed);
            }
            Ok(None) => {}
            Err(e) => warn!(ctx.log, "beacon job: failed to refresh block"; "block_id" => block_id, "error" => %e),
        }
    }
}
