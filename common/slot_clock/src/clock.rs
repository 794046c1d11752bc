use crate::genesis::Genesis;
use crate::primitives::{Epoch, Slot};
use crate::spec::Spec;
use slog::{warn, Logger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    SpecNotInitialized,
    GenesisNotFetched,
}

impl std::fmt::Display for ClockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockError::SpecNotInitialized => write!(f, "spec has not been fetched yet"),
            ClockError::GenesisNotFetched => write!(f, "genesis has not been fetched yet"),
        }
    }
}
impl std::error::Error for ClockError {}

/// Pure slot/epoch derivation: `slot = floor((now - genesis_time) / seconds_per_slot)`,
/// `epoch = slot / slots_per_epoch`. Never returns a negative slot — if
/// `now` precedes genesis, `(0, 0)` is returned instead.
pub fn slot_epoch_at(
    genesis_time: u64,
    seconds_per_slot: Duration,
    slots_per_epoch: u64,
    now: Duration,
) -> (Slot, Epoch) {
    let genesis = Duration::from_secs(genesis_time);
    if now < genesis || seconds_per_slot.is_zero() {
        return (Slot::new(0), Epoch::new(0));
    }
    let elapsed = now - genesis;
    let slot = elapsed.as_secs_f64() / seconds_per_slot.as_secs_f64();
    let slot = Slot::new(slot.floor() as u64);
    let epoch = slot.epoch(slots_per_epoch.max(1));
    (slot, epoch)
}

/// Wraps `slot_epoch_at` with the spec/genesis prerequisite state the
/// observer accumulates during bootstrap, and the "log once" rule for the
/// before-genesis case.
pub struct SlotClock {
    spec: RwLock<Option<Spec>>,
    genesis: RwLock<Option<Genesis>>,
    logged_before_genesis: AtomicBool,
    log: Logger,
}

impl SlotClock {
    pub fn new(log: Logger) -> Self {
        Self {
            spec: RwLock::new(None),
            genesis: RwLock::new(None),
            logged_before_genesis: AtomicBool::new(false),
            log,
        }
    }

    pub fn set_spec(&self, spec: Spec) {
        *self.spec.write().expect("lock not poisoned") = Some(spec);
    }

    pub fn set_genesis(&self, genesis: Genesis) {
        *self.genesis.write().expect("lock not poisoned") = Some(genesis);
    }

    pub fn has_spec(&self) -> bool {
        self.spec.read().expect("lock not poisoned").is_some()
    }

    pub fn has_genesis(&self) -> bool {
        self.genesis.read().expect("lock not poisoned").is_some()
    }

    pub fn spec(&self) -> Option<Spec> {
        self.spec.read().expect("lock not poisoned").clone()
    }

    pub fn genesis(&self) -> Option<Genesis> {
        self.genesis.read().expect("lock not poisoned").clone()
    }

    /// Returns `(slot, epoch)` for the current wall-clock time.
    pub fn now(&self) -> Result<(Slot, Epoch), ClockError> {
        self.now_at(SystemTime::now())
    }

    pub fn now_at(&self, wall_now: SystemTime) -> Result<(Slot, Epoch), ClockError> {
        let spec_guard = self.spec.read().expect("lock not poisoned");
        let spec = spec_guard.as_ref().ok_or(ClockError::SpecNotInitialized)?;
        let genesis_guard = self.genesis.read().expect("lock not poisoned");
        let genesis = genesis_guard
            .as_ref()
            .ok_or(ClockError::GenesisNotFetched)?;

        let slots_per_epoch = spec.slots_per_epoch.ok_or(ClockError::SpecNotInitialized)?;
        let seconds_per_slot = spec
            .seconds_per_slot
            .ok_or(ClockError::SpecNotInitialized)?;

        let now = wall_now
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);

        if now.as_secs() < genesis.genesis_time
            && !self.logged_before_genesis.swap(true, Ordering::SeqCst)
        {
            warn!(self.log, "Wall clock is before genesis time"; "genesis_time" => genesis.genesis_time);
        }

        Ok(slot_epoch_at(
            genesis.genesis_time,
            seconds_per_slot,
            slots_per_epoch,
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_genesis_returns_zero() {
        let (slot, epoch) = slot_epoch_at(1_000, Duration::from_secs(12), 32, Duration::from_secs(0));
        assert_eq!(slot, Slot::new(0));
        assert_eq!(epoch, Epoch::new(0));
    }

    #[test]
    fn derives_expected_slot_and_epoch() {
        // genesis at t=0, 12s slots, 32 slots/epoch, now = slot 50's midpoint.
        let now = Duration::from_secs(50 * 12 + 6);
        let (slot, epoch) = slot_epoch_at(0, Duration::from_secs(12), 32, now);
        assert_eq!(slot, Slot::new(50));
        assert_eq!(epoch, Epoch::new(1));
    }

    #[test]
    fn clock_errors_without_prerequisites() {
        let log = Logger::root(slog::Discard.fuse(), slog::o!());
        let clock = SlotClock::new(log);
        assert_eq!(clock.now(), Err(ClockError::SpecNotInitialized));

        let mut spec = Spec::from_raw_map(&Default::default());
        spec.slots_per_epoch = Some(32);
        spec.seconds_per_slot = Some(Duration::from_secs(12));
        clock.set_spec(spec);
        assert_eq!(clock.now(), Err(ClockError::GenesisNotFetched));
    }
}
