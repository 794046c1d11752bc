use super::ETHEREUM_ROLE_EXECUTION;
use crate::metrics::{
    EXE_BLOCK_NUMBER, EXE_CHAIN_ID, EXE_CLIENT_VERSION, EXE_GAS_PRICE, EXE_IS_SYNCING,
    EXE_PEER_COUNT, EXE_RPC_ERRORS, EXE_SYNC_HIGHEST_BLOCK, EXE_TXPOOL_PENDING,
    EXE_TXPOOL_QUEUED,
};
use execution_client::{ExecutionClient, SyncingStatus};
use metrics::{inc_counter_vec, set_gauge_vec};
use slog::{warn, Logger};
use std::sync::Arc;
use std::time::Duration;
use task_executor::TaskExecutor;

const TICK_INTERVAL: Duration = Duration::from_secs(15);

/// `modules` gates which RPC calls are made, mirroring an execution
/// client's own `--http.api` module list; an empty list means "all".
pub struct ExecutionJobContext {
    pub client: ExecutionClient,
    pub node_name: String,
    pub modules: Vec<String>,
    pub log: Logger,
}

impl ExecutionJobContext {
    fn enabled(&self, module: &str) -> bool {
        self.modules.is_empty() || self.modules.iter().any(|m| m == module)
    }
}

pub async fn run_execution_job(ctx: Arc<ExecutionJobContext>, executor: TaskExecutor) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = executor.exit() => return,
            _ = interval.tick() => tick(&ctx).await,
        }
    }
}

async fn tick(ctx: &ExecutionJobContext) {
    let labels = [ctx.node_name.as_str(), ETHEREUM_ROLE_EXECUTION];

    if ctx.enabled("eth") {
        record(ctx, "eth_chainId", ctx.client.eth_chain_id().await, |n| {
            set_gauge_vec(&EXE_CHAIN_ID, &labels, n as i64);
        });
        record(
            ctx,
            "eth_blockNumber",
            ctx.client.eth_block_number().await,
            |n| set_gauge_vec(&EXE_BLOCK_NUMBER, &labels, n as i64),
        );
        record(ctx, "eth_gasPrice", ctx.client.eth_gas_price().await, |n| {
            set_gauge_vec(&EXE_GAS_PRICE, &labels, n as i64);
        });

        match ctx.client.eth_syncing().await {
            Ok(SyncingStatus::NotSyncing(_)) => {
                set_gauge_vec(&EXE_IS_SYNCING, &labels, 0);
            }
            Ok(SyncingStatus::Syncing(progress)) => {
                set_gauge_vec(&EXE_IS_SYNCING, &labels, 1);
                if let Ok(highest) = parse_hex_prefixed(&progress.highest_block) {
                    set_gauge_vec(&EXE_SYNC_HIGHEST_BLOCK, &labels, highest as i64);
                }
            }
            Err(e) => record_error(ctx, "eth_syncing", &e),
        }
    }

    if ctx.enabled("net") {
        record(
            ctx,
            "net_peerCount",
            ctx.client.net_peer_count().await,
            |n| set_gauge_vec(&EXE_PEER_COUNT, &labels, n as i64),
        );
    }

    if ctx.enabled("web3") {
        match ctx.client.web3_client_version().await {
            Ok(version) => set_gauge_vec(
                &EXE_CLIENT_VERSION,
                &[ctx.node_name.as_str(), ETHEREUM_ROLE_EXECUTION, &version],
                1,
            ),
            Err(e) => record_error(ctx, "web3_clientVersion", &e),
        }
    }

    if ctx.enabled("txpool") {
        match ctx.client.txpool_status().await {
            Ok(status) => {
                set_gauge_vec(&EXE_TXPOOL_PENDING, &labels, status.pending as i64);
                set_gauge_vec(&EXE_TXPOOL_QUEUED, &labels, status.queued as i64);
            }
            Err(e) => record_error(ctx, "txpool_status", &e),
        }
    }
}

fn record<T>(
    ctx: &ExecutionJobContext,
    method: &'static str,
    result: Result<T, execution_client::Error>,
    on_ok: impl FnOnce(T),
) {
    match result {
        Ok(value) => on_ok(value),
        Err(e) => record_error(ctx, method, &e),
    }
}

fn record_error(ctx: &ExecutionJobContext, method: &'static str, e: &execution_client::Error) {
    inc_counter_vec(
        &EXE_RPC_ERRORS,
        &[ctx.node_name.as_str(), ETHEREUM_ROLE_EXECUTION, method],
    );
    warn!(ctx.log, "Execution RPC call failed"; "method" => method, "error" => %e);
}

fn parse_hex_prefixed(s: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
}
