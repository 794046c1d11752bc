//! Consensus-mechanism derivation: compares the execution client's observed
//! total difficulty against the consensus spec's `TERMINAL_TOTAL_DIFFICULTY`,
//! via `consensus_observer::pair::derive`.

use crate::metrics::PAIR_CONSENSUS_MECHANISM;
use consensus_observer::pair::{derive, ConsensusMechanism};
use consensus_observer::{Bus, Event, Topic};
use execution_client::ExecutionClient;
use metrics::set_gauge_vec;
use num_bigint::BigUint;
use parking_lot::Mutex;
use slog::{debug, Logger};
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

const TICK_INTERVAL: Duration = Duration::from_secs(15);
const MECHANISMS: [ConsensusMechanism; 3] = [
    ConsensusMechanism::ProofOfWork,
    ConsensusMechanism::ProofOfAuthority,
    ConsensusMechanism::ProofOfStake,
];

pub struct PairJobContext {
    pub execution: ExecutionClient,
    pub consensus_bus: Arc<Bus>,
    pub node_name: String,
    pub log: Logger,
}

pub async fn run_pair_job(ctx: Arc<PairJobContext>, executor: TaskExecutor) {
    let ttd: Arc<Mutex<Option<BigUint>>> = Arc::new(Mutex::new(None));
    let sub_ttd = ttd.clone();
    ctx.consensus_bus.subscribe(Topic::SpecUpdated, move |event| {
        if let Event::SpecUpdated(spec) = event {
            *sub_ttd.lock() = spec.terminal_total_difficulty.clone();
        }
        Ok(())
    });

    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => tick(&ctx, &ttd).await,
        }
    }
}

async fn tick(ctx: &PairJobContext, ttd: &Mutex<Option<BigUint>>) {
    let chain_id = match ctx.execution.eth_chain_id().await {
        Ok(id) => id,
        Err(e) => {
            debug!(ctx.log, "pair job: could not fetch chain id"; "error" => %e);
            return;
        }
    };

    let observed = match ctx.execution.eth_get_block_by_number("latest", false).await {
        Ok(Some(block)) => block
            .get("totalDifficulty")
            .and_then(|v| v.as_str())
            .and_then(|s| BigUint::parse_bytes(s.trim_start_matches("0x").as_bytes(), 16)),
        Ok(None) => None,
        Err(e) => {
            debug!(ctx.log, "pair job: could not fetch latest block"; "error" => %e);
            None
        }
    };

    let terminal = ttd.lock().clone();
    let mechanism = derive(chain_id, terminal.as_ref(), observed.as_ref());

    for candidate in MECHANISMS {
        let value = if candidate == mechanism { 1 } else { 0 };
        set_gauge_vec(
            &PAIR_CONSENSUS_MECHANISM,
            &[ctx.node_name.as_str(), candidate.as_str()],
            value,
        );
    }
}
