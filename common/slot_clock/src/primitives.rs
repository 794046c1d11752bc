use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A 12-second (by default) time quantum of the consensus chain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub u64);

/// `slots_per_epoch` consecutive `Slot`s; the unit of committee/duty rotation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Slot {
    pub fn new(slot: u64) -> Self {
        Slot(slot)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The epoch containing this slot, under the given `slots_per_epoch`.
    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        Epoch(self.0 / slots_per_epoch)
    }
}

impl Epoch {
    pub fn new(epoch: u64) -> Self {
        Epoch(epoch)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The first slot belonging to this epoch.
    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot(self.0 * slots_per_epoch)
    }

    /// The last slot belonging to this epoch.
    pub fn end_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot(self.0 * slots_per_epoch + slots_per_epoch - 1)
    }
}

impl From<u64> for Slot {
    fn from(v: u64) -> Self {
        Slot(v)
    }
}

impl From<u64> for Epoch {
    fn from(v: u64) -> Self {
        Epoch(v)
    }
}

impl Add<u64> for Slot {
    type Output = Slot;
    fn add(self, rhs: u64) -> Slot {
        Slot(self.0 + rhs)
    }
}

impl Sub<u64> for Slot {
    type Output = Slot;
    fn sub(self, rhs: u64) -> Slot {
        Slot(self.0.saturating_sub(rhs))
    }
}

impl Add<u64> for Epoch {
    type Output = Epoch;
    fn add(self, rhs: u64) -> Epoch {
        Epoch(self.0 + rhs)
    }
}

impl Sub<u64> for Epoch {
    type Output = Epoch;
    fn sub(self, rhs: u64) -> Epoch {
        Epoch(self.0.saturating_sub(rhs))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_of_slot() {
        assert_eq!(Slot(2375680).epoch(32), Epoch(74240));
        assert_eq!(Slot(2375680 + 31).epoch(32), Epoch(74240));
        assert_eq!(Slot(2375680 + 32).epoch(32), Epoch(74241));
    }

    #[test]
    fn epoch_bounds() {
        let epoch = Epoch(3);
        assert_eq!(epoch.start_slot(32), Slot(96));
        assert_eq!(epoch.end_slot(32), Slot(127));
    }
}
