//! The closed set of bus topics and the event payload they carry.
//!
//! Collapses the two pub/sub styles the upstream-style observer would
//! otherwise mix (state-container callback lists, SSE event bus) into the
//! one `event_bus::Bus` — every state transition in this crate goes out
//! through the same channel.

use eth2_client::{
    PeerData, RawEvent, SignedBeaconBlock, SseAttestation, SseBlock, SseChainReorg,
    SseFinalizedCheckpoint, SseHead, SseVoluntaryExit, SyncingData,
};
use slot_clock::{Epoch, Slot, Spec};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    // Upstream-proxied.
    Block,
    Attestation,
    ChainReorg,
    FinalizedCheckpoint,
    Head,
    VoluntaryExit,
    RawEvent,
    /// Not in the upstream-proxied set proper: carries the block event once
    /// C6 has enriched it with the full signed body.
    BeaconBlock,
    // Derived.
    EpochChanged,
    SlotChanged,
    EpochSlotChanged,
    BlockInserted,
    EmptySlot,
    Ready,
    SyncStatus,
    NodeVersionUpdated,
    PeersUpdated,
    SpecUpdated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedBlock {
    pub block: SignedBeaconBlock,
    pub seen_at: SystemTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeaconBlock {
    pub raw_event: SseBlock,
    pub block: SignedBeaconBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSlot {
    pub epoch: Epoch,
    pub slot: Slot,
}

#[derive(Debug, Clone)]
pub enum Event {
    Block(SseBlock),
    Attestation(SseAttestation),
    ChainReorg(SseChainReorg),
    FinalizedCheckpoint(SseFinalizedCheckpoint),
    Head(SseHead),
    VoluntaryExit(SseVoluntaryExit),
    Raw(RawEvent),
    BeaconBlock(BeaconBlock),
    EpochChanged(Epoch),
    SlotChanged(Slot),
    EpochSlotChanged(EpochSlot),
    BlockInserted(TimedBlock),
    EmptySlot(EpochSlot),
    Ready,
    SyncStatus(SyncingData),
    NodeVersionUpdated(String),
    PeersUpdated(Vec<PeerData>),
    SpecUpdated(Spec),
}

pub type Bus = event_bus::Bus<Topic, Event>;
pub type SubscriptionHandle = event_bus::SubscriptionHandle<Topic>;
