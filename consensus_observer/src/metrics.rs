//! Prometheus series for the consensus-side metric jobs (C8), declared the
//! same way Lighthouse's own `network::metrics`/`eth1::metrics` do: a
//! `lazy_static!` block of fallible constructors, observed through the
//! `metrics` crate's no-op-on-error helpers so a duplicate-registration
//! error never panics a job.
//!
//! Every series additionally carries `node_name` and `ethereum_role` as its
//! first two label values, standing in for Prometheus "constant labels"
//! (the `metrics` crate's vec constructors don't expose those directly).

use metrics::*;

lazy_static::lazy_static! {
    // general
    pub static ref NODE_VERSION: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_node_version",
        "Consensus node version, one series per observed version string",
        &["node_name", "ethereum_role", "version"],
    );
    pub static ref PEERS: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_peers",
        "Connected peer count by state and direction",
        &["node_name", "ethereum_role", "state", "direction"],
    );
    pub static ref SLOT_NUMBER: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_slot_number",
        "Slot number by identifier (head, justified, finalized)",
        &["node_name", "ethereum_role", "identifier"],
    );
    pub static ref REORG_COUNT: Result<IntCounterVec> = try_create_int_counter_vec(
        "eth_con_reorg_count",
        "Count of chain reorganisations observed",
        &["node_name", "ethereum_role"],
    );
    pub static ref REORG_DEPTH: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_reorg_depth",
        "Depth of the most recently observed chain reorganisation",
        &["node_name", "ethereum_role"],
    );

    // sync
    pub static ref SYNC_PERCENTAGE: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_sync_percentage",
        "Sync progress percentage, 0-100",
        &["node_name", "ethereum_role"],
    );
    pub static ref SYNC_HEAD_SLOT: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_sync_head_slot",
        "Head slot reported during syncing",
        &["node_name", "ethereum_role"],
    );
    pub static ref SYNC_DISTANCE: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_sync_distance",
        "Sync distance reported upstream",
        &["node_name", "ethereum_role"],
    );
    pub static ref SYNC_IS_SYNCING: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_sync_is_syncing",
        "1 if the node reports it is syncing, 0 otherwise",
        &["node_name", "ethereum_role"],
    );
    pub static ref SYNC_ESTIMATED_HIGHEST_SLOT: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_sync_estimated_highest_slot",
        "head_slot + sync_distance",
        &["node_name", "ethereum_role"],
    );

    // spec
    pub static ref SPEC_VALUE: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_spec_value",
        "One series per scalar chain-spec field that parses as an integer",
        &["node_name", "ethereum_role", "field"],
    );
    pub static ref TERMINAL_TOTAL_DIFFICULTY_TRILLIONS: Result<Gauge> = try_create_float_gauge(
        "eth_con_terminal_total_difficulty_trillions",
        "TERMINAL_TOTAL_DIFFICULTY divided by 10^12",
    );

    // fork
    pub static ref FORK_EPOCH: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_fork_epoch",
        "Activation epoch by fork name",
        &["node_name", "ethereum_role", "fork"],
    );

    // beacon
    pub static ref BEACON_SLOT: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_beacon_slot",
        "Slot number by block identifier and fork version",
        &["node_name", "ethereum_role", "block_id", "version"],
    );
    pub static ref BEACON_ATTESTATIONS: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_beacon_attestations",
        "Attestation count in a block by identifier and fork version",
        &["node_name", "ethereum_role", "block_id", "version"],
    );
    pub static ref BEACON_DEPOSITS: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_beacon_deposits",
        "Deposit count in a block by identifier and fork version",
        &["node_name", "ethereum_role", "block_id", "version"],
    );
    pub static ref BEACON_VOLUNTARY_EXITS: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_beacon_voluntary_exits",
        "Voluntary exit count in a block by identifier and fork version",
        &["node_name", "ethereum_role", "block_id", "version"],
    );
    pub static ref BEACON_TRANSACTIONS: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_beacon_transactions",
        "Execution-payload transaction count (bellatrix+) by identifier and fork version",
        &["node_name", "ethereum_role", "block_id", "version"],
    );
    pub static ref PROPOSER_DELAY: Result<Histogram> = try_create_histogram_with_buckets(
        "eth_con_proposer_delay_milliseconds",
        "Milliseconds between a slot's expected start and when its block was first observed",
        proposer_delay_buckets(),
    );
    pub static ref EMPTY_SLOTS_COUNT: Result<IntCounterVec> = try_create_int_counter_vec(
        "eth_con_empty_slots_count",
        "Count of slots observed with no block after the grace period",
        &["node_name", "ethereum_role"],
    );
    pub static ref HEAD_SLOT_HASH: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_head_slot_hash",
        "FNV-1a hash shard (mod 65536) of the head state root",
        &["node_name", "ethereum_role"],
    );
    pub static ref FINALITY_CHECKPOINT_HASH: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_finality_checkpoint_hash",
        "FNV-1a hash shard (mod 65536) of a finality checkpoint root",
        &["node_name", "ethereum_role", "state_id", "checkpoint"],
    );

    // event
    pub static ref EVENT_COUNT: Result<IntCounterVec> = try_create_int_counter_vec(
        "eth_con_event_count",
        "Count of SSE events observed by topic name",
        &["node_name", "ethereum_role", "name"],
    );
    pub static ref TIME_SINCE_LAST_EVENT_MS: Result<IntGaugeVec> = try_create_int_gauge_vec(
        "eth_con_time_since_last_subscription_event_ms",
        "Milliseconds since the last SSE event of any kind was observed",
        &["node_name", "ethereum_role"],
    );
}

const FNV_OFFSET_BASIS_32: u32 = 0x811c9dc5;
const FNV_PRIME_32: u32 = 0x0100_0193;

/// The literal 32-bit FNV-1a algorithm (not the 64-bit variant truncated),
/// folded into 16 bits, matching the hash-shard convention used for
/// head/finality root gauges.
fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS_32;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME_32);
    }
    hash
}

pub fn fnv1a_shard(bytes: &[u8; 32]) -> i64 {
    (fnv1a_32(bytes) % 65536) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_shard_is_deterministic_and_bounded() {
        let bytes = [7u8; 32];
        let a = fnv1a_shard(&bytes);
        let b = fnv1a_shard(&bytes);
        assert_eq!(a, b);
        assert!(a >= 0 && a < 65536);
    }
}
