//! Prometheus series for the jobs that live in this binary rather than in
//! `consensus_observer`: execution-client translation, disk usage, and
//! consensus-mechanism (`pair`) derivation. Declared the same way
//! `consensus_observer::metrics` declares its own series.

use metrics::*;

lazy_static::lazy_static! {
    pub static ref EXE_CHAIN_ID: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_chain_id",
        "Chain id reported by the execution client",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_BLOCK_NUMBER: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_block_number",
        "Head block number reported by the execution client",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_GAS_PRICE: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_gas_price",
        "Suggested gas price in wei",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_PEER_COUNT: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_peer_count",
        "Connected peer count reported by net_peerCount",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_IS_SYNCING: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_is_syncing",
        "1 if eth_syncing reports an in-progress sync, 0 otherwise",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_SYNC_HIGHEST_BLOCK: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_sync_highest_block",
        "Highest block number reported while syncing",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_TXPOOL_PENDING: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_txpool_pending",
        "Pending transaction pool size",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_TXPOOL_QUEUED: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_txpool_queued",
        "Queued transaction pool size",
        &["node_name", "ethereum_role"],
    );
    pub static ref EXE_CLIENT_VERSION: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_exe_client_version",
        "Execution client version string, one series per observed version",
        &["node_name", "ethereum_role", "version"],
    );
    pub static ref EXE_RPC_ERRORS: Result<IntCounterVec> = try_create_int_counter_vec(
        "eth_exe_rpc_errors_total",
        "Count of execution-client RPC calls that returned an error, by method",
        &["node_name", "ethereum_role", "method"],
    );

    pub static ref DISK_TOTAL_BYTES: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_disk_directory_bytes",
        "Total size in bytes of the files under a configured directory",
        &["node_name", "directory"],
    );
    pub static ref DISK_FILE_COUNT: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_disk_directory_file_count",
        "Count of regular files under a configured directory",
        &["node_name", "directory"],
    );
    pub static ref DISK_FS_TOTAL_BYTES: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_disk_filesystem_total_bytes",
        "Total size of the filesystem backing a configured directory",
        &["node_name", "directory"],
    );
    pub static ref DISK_FS_AVAILABLE_BYTES: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_disk_filesystem_available_bytes",
        "Space available to an unprivileged process on the filesystem backing a configured directory",
        &["node_name", "directory"],
    );
    pub static ref DISK_FS_FREE_BYTES: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_disk_filesystem_free_bytes",
        "Total free space, including blocks reserved for the superuser, on the filesystem backing a configured directory",
        &["node_name", "directory"],
    );

    pub static ref PAIR_CONSENSUS_MECHANISM: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_pair_consensus_mechanism",
        "1 for the currently derived consensus mechanism (pow, poa, pos), 0 for the others",
        &["node_name", "mechanism"],
    );

    pub static ref DOCKER_CONTAINER_UP: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_docker_container_up",
        "1 if a configured container is running, 0 otherwise",
        &["node_name", "container"],
    );
}
