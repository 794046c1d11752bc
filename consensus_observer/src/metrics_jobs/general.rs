use super::{JobContext, ETHEREUM_ROLE_CONSENSUS};
use crate::metrics::{NODE_VERSION, PEERS, REORG_COUNT, REORG_DEPTH, SLOT_NUMBER};
use crate::topics::{Event, Topic};
use eth2_client::{BlockId, StateId};
use metrics::{inc_counter_vec, set_gauge_vec};
use slog::warn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

const TICK_INTERVAL: Duration = Duration::from_secs(15);

pub async fn run_general_job(ctx: Arc<JobContext>, executor: TaskExecutor) {
    let sub_ctx = ctx.clone();
    ctx.bus.subscribe(Topic::ChainReorg, move |event| {
        if let Event::ChainReorg(reorg) = event {
            inc_counter_vec(&REORG_COUNT, &[&sub_ctx.node_name, ETHEREUM_ROLE_CONSENSUS]);
            set_gauge_vec(
                &REORG_DEPTH,
                &[&sub_ctx.node_name, ETHEREUM_ROLE_CONSENSUS],
                reorg.depth as i64,
            );
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
    match ctx.beacon_client.get_node_version().await {
        Ok(version) => set_gauge_vec(
            &NODE_VERSION,
            &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS, &version.version],
            1,
        ),
        Err(e) => warn!(ctx.log, "general job: failed to fetch node version"; "error" => %e),
    }

    match ctx.beacon_client.get_node_peers().await {
        Ok(peers) => {
            let mut counts: HashMap<(String, String), i64> = HashMap::new();
            for peer in peers {
                *counts.entry((peer.state.clone(), peer.direction.clone())).or_insert(0) += 1;
            }
            for ((state, direction), count) in counts {
                set_gauge_vec(
                    &PEERS,
                    &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS, &state, &direction],
                    count,
                );
            }
        }
        Err(e) => warn!(ctx.log, "general job: failed to fetch peers"; "error" => %e),
    }

    if let Ok(Some(header)) = ctx.beacon_client.get_beacon_block_header(BlockId::Head).await {
        set_gauge_vec(
            &SLOT_NUMBER,
            &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS, "head"],
            header.header.message.slot.as_u64() as i64,
        );
    }

    match ctx
        .beacon_client
        .get_beacon_finality_checkpoints(StateId::Head)
        .await
    {
        Ok(checkpoints) => {
            let slots_per_epoch = ctx.state.slots_per_epoch();
            set_gauge_vec(
                &SLOT_NUMBER,
                &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS, "justified"],
                checkpoints
                    .current_justified
                    .epoch
                    .start_slot(slots_per_epoch)
                    .as_u64() as i64,
            );
            set_gauge_vec(
                &SLOT_NUMBER,
                &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS, "finalized"],
                checkpoints.finalized.epoch.start_slot(slots_per_epoch).as_u64() as i64,
            );
        }
        Err(e) => warn!(ctx.log, "general job: failed to fetch finality checkpoints"; "error" => %e),
    }
}
