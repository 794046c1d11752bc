//! Consensus-mechanism derivation for the `pair` job: compares an
//! observed execution-chain total difficulty against the consensus spec's
//! `TERMINAL_TOTAL_DIFFICULTY` to classify the network as still
//! proof-of-work, already proof-of-stake (merged), or a known
//! proof-of-authority testnet.

use num_bigint::BigUint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusMechanism {
    ProofOfWork,
    ProofOfAuthority,
    ProofOfStake,
}

impl ConsensusMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusMechanism::ProofOfWork => "pow",
            ConsensusMechanism::ProofOfAuthority => "poa",
            ConsensusMechanism::ProofOfStake => "pos",
        }
    }
}

/// Goerli's chain id; its execution layer never ran PoW and is excluded
/// from the TTD comparison.
const GOERLI_CHAIN_ID: u64 = 5;

/// `observed_total_difficulty` is the execution client's most recently
/// reported `totalDifficulty` for its head block. `terminal_total_difficulty`
/// comes from the consensus spec; `None` means it hasn't been fetched yet,
/// in which case the network is reported as still proof-of-work (the
/// conservative default until we can say otherwise).
pub fn derive(
    chain_id: u64,
    terminal_total_difficulty: Option<&BigUint>,
    observed_total_difficulty: Option<&BigUint>,
) -> ConsensusMechanism {
    if chain_id == GOERLI_CHAIN_ID {
        return ConsensusMechanism::ProofOfAuthority;
    }

    match (terminal_total_difficulty, observed_total_difficulty) {
        (Some(ttd), Some(observed)) if observed >= ttd => ConsensusMechanism::ProofOfStake,
        _ => ConsensusMechanism::ProofOfWork,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goerli_chain_id_is_always_poa() {
        assert_eq!(
            derive(GOERLI_CHAIN_ID, None, None),
            ConsensusMechanism::ProofOfAuthority
        );
    }

    #[test]
    fn below_ttd_is_still_pow() {
        let ttd = BigUint::from(1000u32);
        let observed = BigUint::from(999u32);
        assert_eq!(
            derive(1, Some(&ttd), Some(&observed)),
            ConsensusMechanism::ProofOfWork
        );
    }

    #[test]
    fn at_or_above_ttd_is_pos() {
        let ttd = BigUint::from(1000u32);
        let observed = BigUint::from(1000u32);
        assert_eq!(
            derive(1, Some(&ttd), Some(&observed)),
            ConsensusMechanism::ProofOfStake
        );
    }

    #[test]
    fn missing_inputs_default_to_pow() {
        assert_eq!(derive(1, None, None), ConsensusMechanism::ProofOfWork);
    }
}
