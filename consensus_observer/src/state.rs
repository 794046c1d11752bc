//! The sliding-window epoch/slot state container (C3).
//!
//! Epochs are owned exclusively by the container, keyed by epoch number;
//! each Epoch owns its Slots by value. There is no shared mutable reference
//! graph — callers read out clones, mutate only through the container's
//! methods.

use crate::topics::{Bus, EpochSlot, Event, Topic, TimedBlock};
use slog::{debug, warn};
use slot_clock::{Epoch, Slot};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposerDuty {
    pub validator_index: u64,
    pub pubkey: String,
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    SlotMismatch { expected: Slot, actual: Slot },
    EpochAlreadyExists(u64),
    EpochNotFound(u64),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::SlotMismatch { expected, actual } => {
                write!(f, "slot mismatch: expected {}, got {}", expected, actual)
            }
            StateError::EpochAlreadyExists(n) => write!(f, "epoch {} already exists", n),
            StateError::EpochNotFound(n) => write!(f, "epoch {} not found", n),
        }
    }
}
impl std::error::Error for StateError {}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotRecord {
    number: Slot,
    block: Option<TimedBlock>,
    proposer_duty: Option<ProposerDuty>,
    empty_slot_marked: bool,
}

impl SlotRecord {
    fn new(number: Slot) -> Self {
        Self {
            number,
            block: None,
            proposer_duty: None,
            empty_slot_marked: false,
        }
    }

    pub fn number(&self) -> Slot {
        self.number
    }

    pub fn block(&self) -> Option<&TimedBlock> {
        self.block.as_ref()
    }

    pub fn proposer_duty(&self) -> Option<&ProposerDuty> {
        self.proposer_duty.as_ref()
    }

    pub fn set_block(&mut self, block_slot: Slot, timed: TimedBlock) -> Result<(), StateError> {
        if block_slot != self.number {
            return Err(StateError::SlotMismatch {
                expected: self.number,
                actual: block_slot,
            });
        }
        self.block = Some(timed);
        Ok(())
    }

    pub fn set_proposer_duty(&mut self, duty: ProposerDuty) -> Result<(), StateError> {
        if duty.slot != self.number {
            return Err(StateError::SlotMismatch {
                expected: self.number,
                actual: duty.slot,
            });
        }
        self.proposer_duty = Some(duty);
        Ok(())
    }

    /// `block.seen_at - (genesis_time + number * seconds_per_slot)`, or
    /// `None` if no block has been recorded.
    pub fn proposer_delay(&self, genesis_time: u64, seconds_per_slot: Duration) -> Option<Duration> {
        let timed = self.block.as_ref()?;
        let offset = seconds_per_slot.saturating_mul(self.number.as_u64() as u32);
        let expected = UNIX_EPOCH + Duration::from_secs(genesis_time) + offset;
        timed.seen_at.duration_since(expected).ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochRecord {
    number: Epoch,
    first_slot: Slot,
    last_slot: Slot,
    start_time: SystemTime,
    end_time: SystemTime,
    duration: Duration,
    slots: Vec<SlotRecord>,
    have_proposer_duties: bool,
}

impl EpochRecord {
    fn new(number: Epoch, slots_per_epoch: u64, genesis_time: u64, seconds_per_slot: Duration) -> Self {
        let first_slot = number.start_slot(slots_per_epoch);
        let last_slot = number.end_slot(slots_per_epoch);
        let start_time = UNIX_EPOCH
            + Duration::from_secs(genesis_time)
            + seconds_per_slot.saturating_mul(first_slot.as_u64() as u32);
        let duration = seconds_per_slot.saturating_mul(slots_per_epoch as u32);
        let end_time = start_time + duration;
        let slots = (0..slots_per_epoch)
            .map(|i| SlotRecord::new(Slot::new(first_slot.as_u64() + i)))
            .collect();

        Self {
            number,
            first_slot,
            last_slot,
            start_time,
            end_time,
            duration,
            slots,
            have_proposer_duties: false,
        }
    }

    pub fn number(&self) -> Epoch {
        self.number
    }

    pub fn first_slot(&self) -> Slot {
        self.first_slot
    }

    pub fn last_slot(&self) -> Slot {
        self.last_slot
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    pub fn end_time(&self) -> SystemTime {
        self.end_time
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn slots(&self) -> &[SlotRecord] {
        &self.slots
    }

    pub fn have_proposer_duties(&self) -> bool {
        self.have_proposer_duties
    }

    fn slot_index(&self, slot: Slot) -> Option<usize> {
        if slot.as_u64() < self.first_slot.as_u64() || slot.as_u64() > self.last_slot.as_u64() {
            return None;
        }
        Some((slot.as_u64() - self.first_slot.as_u64()) as usize)
    }

    pub fn get_slot(&self, slot: Slot) -> Option<&SlotRecord> {
        self.slot_index(slot).and_then(|i| self.slots.get(i))
    }
}

/// A sliding window of `Epoch` records keyed by epoch number, guarded by a
/// single `RwLock`. Construction of the clock parameters (genesis time,
/// slot/epoch durations) is fixed at container creation — they come from
/// the `Spec`/`Genesis` fetched once during bootstrap and do not change
/// across a re-fetch within this crate's scope.
pub struct StateContainer {
    epochs: RwLock<BTreeMap<u64, EpochRecord>>,
    window: u64,
    slots_per_epoch: u64,
    seconds_per_slot: Duration,
    genesis_time: u64,
    bus: Arc<Bus>,
    log: slog::Logger,
}

impl StateContainer {
    pub fn new(
        slots_per_epoch: u64,
        seconds_per_slot: Duration,
        genesis_time: u64,
        window: u64,
        bus: Arc<Bus>,
        log: slog::Logger,
    ) -> Self {
        Self {
            epochs: RwLock::new(BTreeMap::new()),
            window,
            slots_per_epoch,
            seconds_per_slot,
            genesis_time,
            bus,
            log,
        }
    }

    pub fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    pub fn seconds_per_slot(&self) -> Duration {
        self.seconds_per_slot
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.slots_per_epoch
    }

    pub fn exists(&self, n: u64) -> bool {
        self.epochs.read().expect("lock not poisoned").contains_key(&n)
    }

    pub fn get_epoch(&self, n: u64) -> Option<EpochRecord> {
        self.epochs.read().expect("lock not poisoned").get(&n).cloned()
    }

    pub fn new_initialised_epoch(&self, n: u64) -> Result<(), StateError> {
        let mut epochs = self.epochs.write().expect("lock not poisoned");
        if epochs.contains_key(&n) {
            return Err(StateError::EpochAlreadyExists(n));
        }
        let record = EpochRecord::new(
            Epoch::new(n),
            self.slots_per_epoch,
            self.genesis_time,
            self.seconds_per_slot,
        );
        epochs.insert(n, record);
        Ok(())
    }

    /// Ensures every epoch in `[current - W, current + W]` exists.
    pub fn hydrate(&self, current_epoch: u64) {
        let low = current_epoch.saturating_sub(self.window);
        let high = current_epoch.saturating_add(self.window);
        for n in low..=high {
            if !self.exists(n) {
                if let Err(e) = self.new_initialised_epoch(n) {
                    warn!(self.log, "Failed to hydrate epoch"; "epoch" => n, "error" => %e);
                }
            }
        }
    }

    pub fn add_block(&self, timed: TimedBlock) -> Result<(), StateError> {
        let slot = timed.block.slot;
        let epoch_n = slot.epoch(self.slots_per_epoch).as_u64();

        if !self.exists(epoch_n) {
            self.new_initialised_epoch(epoch_n)?;
        }

        {
            let mut epochs = self.epochs.write().expect("lock not poisoned");
            let epoch = epochs
                .get_mut(&epoch_n)
                .ok_or(StateError::EpochNotFound(epoch_n))?;
            let index = epoch
                .slot_index(slot)
                .ok_or(StateError::SlotMismatch {
                    expected: epoch.first_slot,
                    actual: slot,
                })?;
            epoch.slots[index].set_block(slot, timed.clone())?;
        }

        self.bus.publish(Topic::BlockInserted, Event::BlockInserted(timed));
        Ok(())
    }

    pub fn set_proposer_duties(&self, epoch_n: u64, duties: Vec<ProposerDuty>) -> Result<(), StateError> {
        let mut epochs = self.epochs.write().expect("lock not poisoned");
        let epoch = epochs
            .get_mut(&epoch_n)
            .ok_or(StateError::EpochNotFound(epoch_n))?;

        for duty in duties {
            match epoch.slot_index(duty.slot) {
                Some(index) => epoch.slots[index].set_proposer_duty(duty)?,
                None => {
                    debug!(self.log, "Proposer duty slot outside its epoch"; "slot" => %duty.slot, "epoch" => epoch_n);
                }
            }
        }
        epoch.have_proposer_duties = true;
        Ok(())
    }

    /// Scans every initialised epoch's slots in ascending order and marks
    /// + publishes `empty_slot` for any slot that has neither a block nor a
    /// prior marker, and whose expected block time is more than `grace`
    /// (one `seconds_per_slot`) in the past. Slots in the future (including
    /// the remainder of the current, still-in-progress epoch) naturally
    /// fail the time threshold and are left alone.
    pub fn scan_empty_slots(&self, _current_slot: u64, wall_now: SystemTime) {
        let grace = self.seconds_per_slot;
        let mut epochs = self.epochs.write().expect("lock not poisoned");

        for epoch in epochs.values_mut() {
            if epoch.start_time > wall_now {
                continue;
            }

            for slot_record in epoch.slots.iter_mut() {
                if slot_record.block.is_some() || slot_record.empty_slot_marked {
                    continue;
                }

                let offset = self
                    .seconds_per_slot
                    .saturating_mul(slot_record.number.as_u64() as u32);
                let expected = UNIX_EPOCH + Duration::from_secs(self.genesis_time) + offset;
                let threshold = expected + grace;

                if wall_now < threshold {
                    continue;
                }

                slot_record.empty_slot_marked = true;
                self.bus.publish(
                    Topic::EmptySlot,
                    Event::EmptySlot(EpochSlot {
                        epoch: epoch.number,
                        slot: slot_record.number,
                    }),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eth2_client::{BlockBody, Root, SignedBeaconBlock};

    fn null_log() -> slog::Logger {
        slog::Logger::root(slog::Discard.fuse(), slog::o!())
    }

    fn container(window: u64) -> StateContainer {
        StateContainer::new(
            32,
            Duration::from_secs(12),
            0,
            window,
            Arc::new(Bus::new(null_log())),
            null_log(),
        )
    }

    fn block(slot: u64) -> SignedBeaconBlock {
        SignedBeaconBlock {
            version: "phase0".to_string(),
            slot: Slot::new(slot),
            proposer_index: 0,
            parent_root: Root::default(),
            state_root: Root::default(),
            body: BlockBody::default(),
        }
    }

    #[test]
    fn epoch_has_correct_slot_count_and_bounds() {
        let state = container(3);
        state.new_initialised_epoch(5).unwrap();
        let epoch = state.get_epoch(5).unwrap();
        assert_eq!(epoch.slots().len(), 32);
        for s in epoch.slots() {
            assert!(s.number().as_u64() >= epoch.first_slot().as_u64());
            assert!(s.number().as_u64() <= epoch.last_slot().as_u64());
        }
    }

    #[test]
    fn hydrate_creates_full_window() {
        let state = container(3);
        state.hydrate(1000);
        for n in 997..=1003 {
            assert!(state.exists(n), "epoch {} should exist", n);
        }
    }

    #[test]
    fn hydrate_does_not_evict_old_epochs_on_advance() {
        let state = container(3);
        state.hydrate(1000);
        state.hydrate(1001);
        assert!(state.exists(1004));
        assert!(state.exists(996));
    }

    #[test]
    fn add_block_round_trips() {
        let state = container(3);
        let b = block(96);
        let timed = TimedBlock {
            block: b.clone(),
            seen_at: SystemTime::now(),
        };
        state.add_block(timed).unwrap();

        let epoch = state.get_epoch(3).unwrap();
        let slot = epoch.get_slot(Slot::new(96)).unwrap();
        assert_eq!(slot.block().unwrap().block, b);
    }

    #[test]
    fn proposer_duty_rejects_slot_mismatch() {
        let mut slot_record = SlotRecord::new(Slot::new(10));
        let duty = ProposerDuty {
            validator_index: 1,
            pubkey: "0xabc".to_string(),
            slot: Slot::new(11),
        };
        assert!(slot_record.set_proposer_duty(duty).is_err());
    }

    #[test]
    fn proposer_delay_matches_seen_at_offset() {
        let mut slot_record = SlotRecord::new(Slot::new(50));
        let seen_at = UNIX_EPOCH + Duration::from_secs(50 * 12) + Duration::from_millis(1300);
        slot_record
            .set_block(
                Slot::new(50),
                TimedBlock {
                    block: block(50),
                    seen_at,
                },
            )
            .unwrap();
        let delay = slot_record.proposer_delay(0, Duration::from_secs(12)).unwrap();
        assert_eq!(delay, Duration::from_millis(1300));
    }

    #[test]
    fn empty_slot_is_marked_once() {
        let state = container(3);
        state.new_initialised_epoch(3).unwrap();

        let wall_now = UNIX_EPOCH + Duration::from_secs(12 * 100 + 13);
        state.scan_empty_slots(101, wall_now);
        let epoch = state.get_epoch(3).unwrap();
        assert!(epoch.get_slot(Slot::new(100)).unwrap().empty_slot_marked);

        // A second scan one second later must not re-emit (idempotent marker).
        let wall_now_2 = wall_now + Duration::from_secs(1);
        state.scan_empty_slots(101, wall_now_2);
        let epoch = state.get_epoch(3).unwrap();
        assert!(epoch.get_slot(Slot::new(100)).unwrap().empty_slot_marked);
    }
}
