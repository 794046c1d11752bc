//! Consensus-side observation daemon: bootstraps against one beacon node,
//! maintains a sliding window of epoch/slot state, republishes its SSE
//! event stream on a typed bus, and drives the Prometheus series every
//! downstream metric job exposes.

pub mod metrics;
pub mod metrics_jobs;
pub mod observer;
pub mod pair;
pub mod publisher;
pub mod state;
pub mod topics;

pub use observer::Observer;
pub use state::StateContainer;
pub use topics::{Bus, Event, Topic};
