use super::{JobContext, ETHEREUM_ROLE_CONSENSUS};
use crate::metrics::FORK_EPOCH;
use metrics::set_gauge_vec;
use slog::warn;
use slot_clock::Spec;
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

const TICK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Independent of the `spec` job: refetches the chain spec on its own
/// 10 minute cadence and records one `FORK_EPOCH{fork}` gauge per known fork
/// name, regardless of whether that fork has activated yet.
pub async fn run_fork_job(ctx: Arc<JobContext>, executor: TaskExecutor) {
    tick(&ctx).await;

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => tick(&ctx).await,
        }
    }
}

async fn tick(ctx: &JobContext) {
    match ctx.beacon_client.get_config_spec().await {
        Ok(raw) => {
            let spec = Spec::from_raw_map(&raw);
            for fork in &spec.forks {
                set_gauge_vec(
                    &FORK_EPOCH,
                    &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS, &fork.name],
                    fork.activation_epoch.as_u64() as i64,
                );
            }
        }
        Err(e) => warn!(ctx.log, "fork job: failed to fetch chain spec"; "error" => %e),
    }
}
