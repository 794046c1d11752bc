//! Entry point: loads configuration, wires the consensus observer and the
//! thin execution/disk/pair/docker translator jobs together, and serves
//! `/metrics` + `/`.

mod cli;
mod config;
mod http;
mod jobs;
mod metrics;

use cli::Command;
use config::Config;
use consensus_observer::metrics_jobs::{self, JobContext, ETHEREUM_ROLE_CONSENSUS};
use consensus_observer::{Bus as ConsensusBus, Observer};
use eth2_client::{BeaconNodeHttpClient, EventTopic};
use execution_client::ExecutionClient;
use filesystem_monitor::DirectoryStatsCache;
use jobs::{
    run_disk_job, run_docker_job, run_execution_job, run_pair_job, DiskJobContext,
    DockerJobContext, ExecutionJobContext, PairJobContext,
};
use slog::{info, o, warn, Drain, Logger};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use task_executor::{shutdown_signal, TaskExecutor};

fn build_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

fn main() {
    let log = build_logger();

    match cli::parse() {
        Command::Status { config_path } => {
            let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
            runtime.block_on(run_status(&config_path));
        }
        Command::Serve { config_path, metrics_port } => {
            let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
            runtime.block_on(run_serve(log, config_path, metrics_port));
        }
    }
}

async fn run_status(config_path: &str) {
    let config = match Config::from_file(&PathBuf::from(config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("could not load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(consensus) = config.consensus.as_ref().filter(|c| c.enabled) {
        let url = consensus.url.as_deref().unwrap_or_default();
        match reqwest::Url::parse(url) {
            Ok(parsed) => {
                let client = BeaconNodeHttpClient::new(parsed);
                match client.get_node_syncing().await {
                    Ok(data) => println!(
                        "consensus ({}): head_slot={} sync_distance={} is_syncing={} is_optimistic={}",
                        consensus.name, data.head_slot, data.sync_distance, data.is_syncing, data.is_optimistic,
                    ),
                    Err(e) => println!("consensus ({}): error: {}", consensus.name, e),
                }
            }
            Err(e) => println!("consensus ({}): invalid url {:?}: {}", consensus.name, url, e),
        }
    }

    if let Some(execution) = config.execution.as_ref().filter(|e| e.enabled) {
        let url = execution.url.as_deref().unwrap_or_default();
        match reqwest::Url::parse(url) {
            Ok(parsed) => {
                let client = ExecutionClient::new(parsed);
                match client.eth_syncing().await {
                    Ok(status) => println!("execution ({}): {:?}", execution.name, status),
                    Err(e) => println!("execution ({}): error: {}", execution.name, e),
                }
            }
            Err(e) => println!("execution ({}): invalid url {:?}: {}", execution.name, url, e),
        }
    }
}

/// Handles to whatever got wired up, passed along so the `pair` job (which
/// needs both a consensus bus and an execution client) can be assembled
/// after both independent sections have started.
#[derive(Clone)]
struct ConsensusHandles {
    bus: Arc<ConsensusBus>,
}

async fn run_serve(log: Logger, config_path: String, metrics_port: u16) {
    let config = match Config::from_file(&PathBuf::from(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("could not load config: {}", e);
            std::process::exit(1);
        }
    };

    let (executor, shutdown_tx) = shutdown_signal(tokio::runtime::Handle::current(), log.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_tx.shutdown();
        }
    });

    http::spawn(&executor, metrics_port);

    let consensus_handles = config
        .consensus
        .as_ref()
        .filter(|c| c.enabled)
        .cloned()
        .map(|consensus| spawn_consensus(&executor, &log, &consensus))
        .flatten();

    let execution_client = config
        .execution
        .as_ref()
        .filter(|e| e.enabled)
        .cloned()
        .and_then(|execution| spawn_execution(&executor, &log, &execution));

    let node_name = config
        .consensus
        .as_ref()
        .map(|c| c.name.clone())
        .or_else(|| config.execution.as_ref().map(|e| e.name.clone()))
        .unwrap_or_else(|| "default".to_string());

    if config.pair.as_ref().map(|p| p.enabled).unwrap_or(false) {
        match (&consensus_handles, &execution_client) {
            (Some(consensus), Some(execution)) => {
                let ctx = Arc::new(PairJobContext {
                    execution: execution.clone(),
                    consensus_bus: consensus.bus.clone(),
                    node_name: node_name.clone(),
                    log: log.clone(),
                });
                executor.handle().spawn(run_pair_job(ctx, executor.clone()));
            }
            _ => warn!(log, "pair.enabled is true but requires both execution and consensus sections enabled"),
        }
    }

    if let Some(disk) = config.disk_usage.as_ref().filter(|d| d.enabled).cloned() {
        spawn_disk(&executor, &log, &disk, &node_name);
    }

    if let Some(docker) = config.docker.as_ref().filter(|d| d.enabled).cloned() {
        spawn_docker(&executor, &log, &docker, &node_name);
    }

    info!(log, "node_exporter serving"; "metrics_port" => metrics_port);
    executor.exit().await;
    info!(log, "shutdown complete");
}

fn spawn_execution(
    executor: &TaskExecutor,
    log: &Logger,
    execution: &config::ExecutionConfig,
) -> Option<ExecutionClient> {
    let url = match reqwest::Url::parse(execution.url.as_deref().unwrap_or_default()) {
        Ok(url) => url,
        Err(e) => {
            warn!(log, "invalid execution url, execution collection disabled"; "error" => %e);
            return None;
        }
    };

    let client = ExecutionClient::new(url);

    let ctx = Arc::new(ExecutionJobContext {
        client: client.clone(),
        node_name: execution.name.clone(),
        modules: execution.modules.clone(),
        log: log.clone(),
    });
    executor.handle().spawn(run_execution_job(ctx, executor.clone()));

    Some(client)
}

fn spawn_consensus(
    executor: &TaskExecutor,
    log: &Logger,
    consensus: &config::ConsensusConfig,
) -> Option<ConsensusHandles> {
    let url = match reqwest::Url::parse(consensus.url.as_deref().unwrap_or_default()) {
        Ok(url) => url,
        Err(e) => {
            warn!(log, "invalid consensus url, consensus collection disabled"; "error" => %e);
            return None;
        }
    };

    let client = BeaconNodeHttpClient::new(url);
    let bus = Arc::new(ConsensusBus::new(log.clone()));

    let event_topics = consensus
        .event_stream
        .as_ref()
        .filter(|es| es.enabled)
        .map(|es| {
            let parsed: Vec<EventTopic> = es
                .topics
                .iter()
                .filter_map(|s| EventTopic::from_str(s).ok())
                .collect();
            if parsed.is_empty() {
                EventTopic::ALL.to_vec()
            } else {
                parsed
            }
        })
        .unwrap_or_else(|| EventTopic::ALL.to_vec());

    let observer = Observer::new(client.clone(), bus.clone(), event_topics, log.clone());
    let clock = observer.clock();
    let state_handle = observer.state_handle();

    executor.handle().spawn(observer.run(executor.clone()));

    let job_executor = executor.clone();
    let job_log = log.clone();
    let node_name = consensus.name.clone();
    let job_bus = bus.clone();
    executor.handle().spawn(async move {
        loop {
            if job_executor.is_shutdown() {
                return;
            }
            let state = state_handle.lock().clone();
            if let Some(state) = state {
                let ctx = Arc::new(JobContext {
                    bus: job_bus,
                    beacon_client: client,
                    state,
                    clock,
                    node_name,
                    consensus_role: ETHEREUM_ROLE_CONSENSUS,
                    log: job_log.clone(),
                });

                job_executor.handle().spawn(metrics_jobs::run_general_job(ctx.clone(), job_executor.clone()));
                job_executor.handle().spawn(metrics_jobs::run_sync_job(ctx.clone(), job_executor.clone()));
                job_executor.handle().spawn(metrics_jobs::run_spec_job(ctx.clone(), job_executor.clone()));
                job_executor.handle().spawn(metrics_jobs::run_fork_job(ctx.clone(), job_executor.clone()));
                job_executor.handle().spawn(metrics_jobs::run_beacon_job(ctx.clone(), job_executor.clone()));
                job_executor.handle().spawn(metrics_jobs::run_event_job(ctx, job_executor.clone()));
                return;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    Some(ConsensusHandles { bus })
}

fn spawn_disk(executor: &TaskExecutor, log: &Logger, disk: &config::DiskUsageConfig, node_name: &str) {
    let ctx = Arc::new(DiskJobContext {
        cache: DirectoryStatsCache::new(log.clone()),
        directories: disk.directories.iter().map(PathBuf::from).collect(),
        node_name: node_name.to_string(),
        interval: Duration::from_secs(disk.interval.max(1)),
        log: log.clone(),
    });

    executor.handle().spawn(run_disk_job(ctx, executor.clone()));
}

fn spawn_docker(executor: &TaskExecutor, log: &Logger, docker: &config::DockerConfig, node_name: &str) {
    let endpoint = match reqwest::Url::parse(docker.endpoint.as_deref().unwrap_or_default()) {
        Ok(url) => url,
        Err(e) => {
            warn!(log, "invalid docker endpoint, docker collection disabled"; "error" => %e);
            return;
        }
    };

    let ctx = Arc::new(DockerJobContext {
        client: reqwest::Client::new(),
        endpoint,
        containers: docker.containers.clone(),
        node_name: node_name.to_string(),
        interval: Duration::from_secs(docker.interval.max(1)),
        log: log.clone(),
    });

    executor.handle().spawn(run_docker_job(ctx, executor.clone()));
}
