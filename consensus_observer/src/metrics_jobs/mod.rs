//! Metric jobs (C8): independent long-lived workers, each translating bus
//! events and/or its own periodic tick into Prometheus series. Jobs never
//! share mutable state with each other — all communication is through the
//! bus and (read-only) the state container.

mod beacon;
mod event;
mod fork;
mod general;
mod spec_job;
mod sync;

pub use beacon::run_beacon_job;
pub use event::run_event_job;
pub use fork::run_fork_job;
pub use general::run_general_job;
pub use spec_job::run_spec_job;
pub use sync::run_sync_job;

use crate::state::StateContainer;
use crate::topics::Bus;
use eth2_client::BeaconNodeHttpClient;
use slog::Logger;
use slot_clock::SlotClock;
use std::sync::Arc;

/// Shared handles every metric job needs. `node_name`/`consensus_role` are
/// the constant-label values every series in this crate carries.
pub struct JobContext {
    pub bus: Arc<Bus>,
    pub beacon_client: BeaconNodeHttpClient,
    pub state: Arc<StateContainer>,
    pub clock: Arc<SlotClock>,
    pub node_name: String,
    pub consensus_role: &'static str,
    pub log: Logger,
}

pub const ETHEREUM_ROLE_CONSENSUS: &str = "consensus";
