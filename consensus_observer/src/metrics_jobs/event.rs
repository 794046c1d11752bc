use super::{JobContext, ETHEREUM_ROLE_CONSENSUS};
use crate::metrics::{EVENT_COUNT, TIME_SINCE_LAST_EVENT_MS};
use crate::topics::{Event, Topic};
use metrics::{inc_counter_vec, set_gauge_vec};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use task_executor::TaskExecutor;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Counts every raw SSE event by topic name and tracks how long it has been
/// since the last one of any kind arrived — the daemon's single best signal
/// that the upstream subscription has gone quiet (spec.md §4.8).
pub async fn run_event_job(ctx: Arc<JobContext>, executor: TaskExecutor) {
    let last_seen = Arc::new(Mutex::new(Instant::now()));

    for topic in [
        Topic::Head,
        Topic::Block,
        Topic::Attestation,
        Topic::VoluntaryExit,
        Topic::ChainReorg,
        Topic::FinalizedCheckpoint,
    ] {
        let sub_ctx = ctx.clone();
        let last_seen = last_seen.clone();
        ctx.bus.subscribe(topic, move |event| {
            *last_seen.lock() = Instant::now();
            inc_counter_vec(&EVENT_COUNT, &[&sub_ctx.node_name, ETHEREUM_ROLE_CONSENSUS, topic_name(event)]);
            Ok(())
        });
    }

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => {
                let elapsed = last_seen.lock().elapsed();
                set_gauge_vec(
                    &TIME_SINCE_LAST_EVENT_MS,
                    &[&ctx.node_name, ETHEREUM_ROLE_CONSENSUS],
                    elapsed.as_millis() as i64,
                );
            }
        }
    }
}

fn topic_name(event: &Event) -> &'static str {
    match event {
        Event::Head(_) => "head",
        Event::Block(_) => "block",
        Event::Attestation(_) => "attestation",
        Event::VoluntaryExit(_) => "voluntary_exit",
        Event::ChainReorg(_) => "chain_reorg",
        Event::FinalizedCheckpoint(_) => "finalized_checkpoint",
        _ => "other",
    }
}
