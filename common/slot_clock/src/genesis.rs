use std::time::Duration;

/// `GET /eth/v1/beacon/genesis`. Immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Genesis {
    /// Unix timestamp of genesis.
    pub genesis_time: u64,
    pub genesis_validators_root: [u8; 32],
    pub genesis_fork_version: [u8; 4],
}

impl Genesis {
    pub fn genesis_duration(&self) -> Duration {
        Duration::from_secs(self.genesis_time)
    }
}
