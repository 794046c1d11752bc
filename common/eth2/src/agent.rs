//! Classifies a peer's `agent_string` into one of the known client
//! implementations.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    Lighthouse,
    Nimbus,
    Teku,
    Prysm,
    Lodestar,
    Unknown,
}

impl ClientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::Lighthouse => "lighthouse",
            ClientKind::Nimbus => "nimbus",
            ClientKind::Teku => "teku",
            ClientKind::Prysm => "prysm",
            ClientKind::Lodestar => "lodestar",
            ClientKind::Unknown => "unknown",
        }
    }
}

/// Case-insensitive substring match against the known client names, tried in
/// a fixed order. Two names appearing in the same string is not a case any
/// real agent string produces, but the order (lighthouse, nimbus, teku,
/// prysm, lodestar) makes the result deterministic regardless.
pub fn classify(agent_string: &str) -> ClientKind {
    let lower = agent_string.to_ascii_lowercase();
    const ORDER: [(&str, ClientKind); 5] = [
        ("lighthouse", ClientKind::Lighthouse),
        ("nimbus", ClientKind::Nimbus),
        ("teku", ClientKind::Teku),
        ("prysm", ClientKind::Prysm),
        ("lodestar", ClientKind::Lodestar),
    ];
    for (needle, kind) in ORDER {
        if lower.contains(needle) {
            return kind;
        }
    }
    ClientKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_each_known_client() {
        assert_eq!(classify("Lighthouse/v4.1.0"), ClientKind::Lighthouse);
        assert_eq!(classify("nimbus-eth2/v23.1.0"), ClientKind::Nimbus);
        assert_eq!(classify("teku/teku/v23.1.0"), ClientKind::Teku);
        assert_eq!(classify("Prysm/v4.0.1"), ClientKind::Prysm);
        assert_eq!(classify("js-libp2p/Lodestar/v1.5.0"), ClientKind::Lodestar);
    }

    #[test]
    fn unrecognised_string_is_unknown() {
        assert_eq!(classify("go-ethereum/v1.0"), ClientKind::Unknown);
        assert_eq!(classify(""), ClientKind::Unknown);
    }

    #[test]
    fn first_match_in_order_wins_on_ambiguous_strings() {
        assert_eq!(classify("lighthouse-teku-bridge"), ClientKind::Lighthouse);
    }
}
