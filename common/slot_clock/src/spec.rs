use crate::primitives::Epoch;
use num_bigint::BigUint;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// A named fork and the epoch at which it activates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkEpoch {
    pub name: String,
    pub activation_epoch: Epoch,
}

impl ForkEpoch {
    /// A fork is active at `slot` iff `slot / slots_per_epoch > activation_epoch`
    /// (strictly greater than — the activation epoch itself has not yet
    /// switched over).
    pub fn is_active_at(&self, current_epoch: Epoch) -> bool {
        current_epoch.as_u64() > self.activation_epoch.as_u64()
    }
}

const FORK_EPOCH_SUFFIX: &str = "_FORK_EPOCH";

/// The upstream chain-spec map (`GET /eth/v1/config/spec`), projected into
/// typed fields. Unknown keys are ignored; recognised keys are coerced
/// per the table in spec.md §4.1. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Spec {
    pub preset_base: Option<String>,
    pub config_name: Option<String>,
    pub deposit_chain_id: Option<u64>,
    pub slots_per_epoch: Option<u64>,
    pub seconds_per_slot: Option<Duration>,
    pub seconds_per_eth1_block: Option<Duration>,
    pub genesis_delay: Option<Duration>,
    pub eth1_follow_distance: Option<u64>,
    pub target_committee_size: Option<u64>,
    pub max_committees_per_slot: Option<u64>,
    pub base_reward_factor: Option<u64>,
    pub terminal_total_difficulty: Option<BigUint>,
    pub forks: Vec<ForkEpoch>,
    /// The raw map this `Spec` was parsed from, kept around so the `spec`
    /// metric job can iterate "one gauge per scalar spec field" without
    /// runtime reflection over the typed struct.
    pub raw: BTreeMap<String, String>,
}

/// Errors returned by `Spec::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingSlotsPerEpoch,
    MissingSecondsPerSlot,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingSlotsPerEpoch => write!(f, "spec is missing SLOTS_PER_EPOCH"),
            ValidationError::MissingSecondsPerSlot => {
                write!(f, "spec is missing SECONDS_PER_SLOT")
            }
        }
    }
}
impl std::error::Error for ValidationError {}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    }
}

fn parse_duration_secs(value: &Value) -> Option<Duration> {
    parse_u64(value).map(Duration::from_secs)
}

impl Spec {
    /// Builds a `Spec` from the upstream `/eth/v1/config/spec` response's
    /// `data` map: upper-snake-case keys to untyped JSON scalars.
    pub fn from_raw_map(map: &BTreeMap<String, Value>) -> Self {
        let mut spec = Spec {
            preset_base: None,
            config_name: None,
            deposit_chain_id: None,
            slots_per_epoch: None,
            seconds_per_slot: None,
            seconds_per_eth1_block: None,
            genesis_delay: None,
            eth1_follow_distance: None,
            target_committee_size: None,
            max_committees_per_slot: None,
            base_reward_factor: None,
            terminal_total_difficulty: None,
            forks: Vec::new(),
            raw: BTreeMap::new(),
        };

        for (key, value) in map {
            if let Some(s) = value_as_string(value) {
                spec.raw.insert(key.clone(), s);
            }

            match key.as_str() {
                "PRESET_BASE" => spec.preset_base = value_as_string(value),
                "CONFIG_NAME" => spec.config_name = value_as_string(value),
                "DEPOSIT_CHAIN_ID" => spec.deposit_chain_id = parse_u64(value),
                "SLOTS_PER_EPOCH" => spec.slots_per_epoch = parse_u64(value),
                "SECONDS_PER_SLOT" => spec.seconds_per_slot = parse_duration_secs(value),
                "SECONDS_PER_ETH1_BLOCK" => {
                    spec.seconds_per_eth1_block = parse_duration_secs(value)
                }
                "GENESIS_DELAY" => spec.genesis_delay = parse_duration_secs(value),
                "ETH1_FOLLOW_DISTANCE" => spec.eth1_follow_distance = parse_u64(value),
                "TARGET_COMMITTEE_SIZE" => spec.target_committee_size = parse_u64(value),
                "MAX_COMMITTEES_PER_SLOT" => spec.max_committees_per_slot = parse_u64(value),
                "BASE_REWARD_FACTOR" => spec.base_reward_factor = parse_u64(value),
                "TERMINAL_TOTAL_DIFFICULTY" => {
                    spec.terminal_total_difficulty = value_as_string(value)
                        .and_then(|s| BigUint::parse_bytes(s.as_bytes(), 10));
                }
                other if other.ends_with(FORK_EPOCH_SUFFIX) => {
                    if let Some(epoch) = parse_u64(value) {
                        let name = other
                            .trim_end_matches(FORK_EPOCH_SUFFIX)
                            .to_ascii_lowercase();
                        spec.forks.push(ForkEpoch {
                            name,
                            activation_epoch: Epoch::new(epoch),
                        });
                    }
                }
                _ => {}
            }
        }

        spec.forks.sort_by_key(|f| f.activation_epoch.as_u64());
        spec
    }

    /// Checked before the clock is allowed to use this spec.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.slots_per_epoch.is_none() {
            return Err(ValidationError::MissingSlotsPerEpoch);
        }
        if self.seconds_per_slot.is_none() {
            return Err(ValidationError::MissingSecondsPerSlot);
        }
        Ok(())
    }

    /// The active fork with the largest activation epoch, at `current_epoch`.
    pub fn current_fork(&self, current_epoch: Epoch) -> Option<&ForkEpoch> {
        self.forks
            .iter()
            .filter(|f| f.is_active_at(current_epoch))
            .max_by_key(|f| f.activation_epoch.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn parses_recognised_scalars_and_ignores_unknown() {
        let raw = map(&[
            ("SLOTS_PER_EPOCH", Value::String("32".to_string())),
            ("SECONDS_PER_SLOT", Value::String("12".to_string())),
            ("SOME_UNKNOWN_FIELD", Value::String("whatever".to_string())),
            (
                "TERMINAL_TOTAL_DIFFICULTY",
                Value::String("58750000000000000000000".to_string()),
            ),
        ]);
        let spec = Spec::from_raw_map(&raw);
        assert_eq!(spec.slots_per_epoch, Some(32));
        assert_eq!(spec.seconds_per_slot, Some(Duration::from_secs(12)));
        assert_eq!(
            spec.terminal_total_difficulty,
            BigUint::parse_bytes(b"58750000000000000000000", 10)
        );
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let spec = Spec::from_raw_map(&BTreeMap::new());
        assert_eq!(spec.validate(), Err(ValidationError::MissingSlotsPerEpoch));
    }

    #[test]
    fn fork_epoch_suffix_derivation() {
        let raw = map(&[
            ("ALTAIR_FORK_EPOCH", Value::String("74240".to_string())),
            ("BELLATRIX_FORK_EPOCH", Value::String("144896".to_string())),
        ]);
        let spec = Spec::from_raw_map(&raw);
        assert_eq!(spec.forks.len(), 2);
        assert_eq!(spec.forks[0].name, "altair");
        assert_eq!(spec.forks[1].name, "bellatrix");
    }

    #[test]
    fn fork_activation_strictly_greater_than() {
        let fork = ForkEpoch {
            name: "altair".to_string(),
            activation_epoch: Epoch::new(74240),
        };
        assert!(!fork.is_active_at(Epoch::new(74240)));
        assert!(fork.is_active_at(Epoch::new(74241)));
    }
}
