mod clock;
mod genesis;
mod primitives;
mod spec;

pub use clock::{slot_epoch_at, ClockError, SlotClock};
pub use genesis::Genesis;
pub use primitives::{Epoch, Slot};
pub use spec::{ForkEpoch, Spec, ValidationError};
