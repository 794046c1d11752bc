//! REST/SSE client for a single upstream beacon node.
//!
//! Kept from Lighthouse's own `common/eth2` crate: the `{BlockId, StateId}`
//! parsing, the `data`-enveloped response types and the SSE line-parsing in
//! `EventKind::from_sse_bytes`. Dropped: anything that required the full
//! SSZ/BLS `types` crate, since this daemon never validates or re-encodes
//! consensus objects, only reads fields back off already-decoded JSON.

pub mod agent;
pub mod client;
pub mod sse;
pub mod types;

pub use agent::{classify, ClientKind};
pub use client::{BeaconNodeHttpClient, Error as ClientError};
pub use types::*;
