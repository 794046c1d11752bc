//! Typed surface over the beacon REST API's `data`-enveloped JSON responses.
//!
//! Adapted from Lighthouse's own `common/eth2::types` (kept: the
//! `{BlockId,StateId}::FromStr`/`Display` pair, the `GenericResponse`
//! envelope, the `Sse*` record shapes and `EventKind::from_sse_bytes`
//! line-splitting). Dropped: everything that required the full SSZ/BLS
//! `types` crate (`Validator`, `Attestation<T: EthSpec>`, ...) — this daemon
//! never validates or re-encodes a block, it only reads JSON fields back
//! off the wire, so a 32-byte `Root` plus `slot_clock::{Slot, Epoch}` is
//! enough typing for the whole surface.

use serde::{Deserialize, Serialize};
use slot_clock::{Epoch, Slot};
use std::fmt;
use std::str::FromStr;

/// A 32-byte root, serialized upstream as a `0x`-prefixed hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Root(pub [u8; 32]);

impl Serialize for Root {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for Root {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Root::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for Root {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| format!("invalid hex root: {}", e))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "root must be 32 bytes".to_string())?;
        Ok(Root(arr))
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// An API error serializable to JSON, as returned by non-2xx beacon API
/// responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub stacktraces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisData {
    #[serde(with = "quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: Root,
    pub genesis_fork_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Head,
    Genesis,
    Finalized,
    Justified,
    Slot(Slot),
    Root(Root),
}

impl FromStr for BlockId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(BlockId::Head),
            "genesis" => Ok(BlockId::Genesis),
            "finalized" => Ok(BlockId::Finalized),
            "justified" => Ok(BlockId::Justified),
            other if other.starts_with("0x") => {
                Root::from_str(other).map(BlockId::Root)
            }
            other => u64::from_str(other)
                .map(Slot::new)
                .map(BlockId::Slot)
                .map_err(|_| format!("{} cannot be parsed as a block id", other)),
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Head => write!(f, "head"),
            BlockId::Genesis => write!(f, "genesis"),
            BlockId::Finalized => write!(f, "finalized"),
            BlockId::Justified => write!(f, "justified"),
            BlockId::Slot(slot) => write!(f, "{}", slot),
            BlockId::Root(root) => write!(f, "{}", root),
        }
    }
}

pub type StateId = BlockId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericResponse<T> {
    pub data: T,
}

impl<T> From<T> for GenericResponse<T> {
    fn from(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Root,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalityCheckpointsData {
    pub previous_justified: Checkpoint,
    pub current_justified: Checkpoint,
    pub finalized: Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderData {
    pub root: Root,
    pub canonical: bool,
    pub header: BlockHeaderMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderMessage {
    pub message: BlockHeaderInner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderInner {
    pub slot: Slot,
    pub proposer_index: u64,
    pub parent_root: Root,
    pub state_root: Root,
}

/// A response-shaped proposer duty: one validator assigned to one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposerData {
    pub pubkey: String,
    #[serde(with = "quoted_u64")]
    pub validator_index: u64,
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutiesResponse<T> {
    pub dependent_root: Root,
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerDirection {
    Inbound,
    Outbound,
}

impl FromStr for PeerDirection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(PeerDirection::Inbound),
            "outbound" => Ok(PeerDirection::Outbound),
            _ => Err("peer direction cannot be parsed".to_string()),
        }
    }
}

impl fmt::Display for PeerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerDirection::Inbound => write!(f, "inbound"),
            PeerDirection::Outbound => write!(f, "outbound"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerData {
    pub peer_id: String,
    pub state: String,
    pub direction: String,
    #[serde(default)]
    pub agent_string: Option<String>,
}

/// Several beacon client implementations return peer counts as either
/// quoted strings or bare numbers — accept both (spec.md §9 open question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerCount {
    #[serde(with = "lenient_u64")]
    pub connected: u64,
    #[serde(with = "lenient_u64")]
    pub connecting: u64,
    #[serde(with = "lenient_u64")]
    pub disconnected: u64,
    #[serde(with = "lenient_u64")]
    pub disconnecting: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncingData {
    pub head_slot: Slot,
    #[serde(with = "quoted_u64")]
    pub sync_distance: u64,
    pub is_syncing: bool,
    #[serde(default)]
    pub is_optimistic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionData {
    pub version: String,
}

// --------- Beacon block body (JSON-shaped, fork-erased) -----------

/// The fields common across fork variants that this daemon reads.
/// `transactions` is only populated from Bellatrix onward (it lives inside
/// `execution_payload` in the real API response; the REST client flattens it
/// here so callers don't need to know which fork shape they're looking at).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    #[serde(default)]
    pub proposer_slashings: Vec<serde_json::Value>,
    #[serde(default)]
    pub attester_slashings: Vec<serde_json::Value>,
    #[serde(default)]
    pub attestations: Vec<serde_json::Value>,
    #[serde(default)]
    pub deposits: Vec<serde_json::Value>,
    #[serde(default)]
    pub voluntary_exits: Vec<serde_json::Value>,
    #[serde(default)]
    pub transactions: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub version: String,
    pub slot: Slot,
    pub proposer_index: u64,
    pub parent_root: Root,
    pub state_root: Root,
    pub body: BlockBody,
}

// --------- Server Sent Event types -----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseBlock {
    pub slot: Slot,
    pub block: Root,
    #[serde(default)]
    pub execution_optimistic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseFinalizedCheckpoint {
    pub block: Root,
    pub state: Root,
    pub epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseHead {
    pub slot: Slot,
    pub block: Root,
    pub state: Root,
    pub current_duty_dependent_root: Root,
    pub previous_duty_dependent_root: Root,
    pub epoch_transition: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseChainReorg {
    pub slot: Slot,
    pub depth: u64,
    pub old_head_block: Root,
    pub new_head_block: Root,
    pub old_head_state: Root,
    pub new_head_state: Root,
    pub epoch: Epoch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseVoluntaryExit {
    pub message: VoluntaryExitMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoluntaryExitMessage {
    pub epoch: Epoch,
    pub validator_index: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SseAttestation {
    pub aggregation_bits: String,
    pub data: serde_json::Value,
}

/// The closed set of topics this daemon subscribes to upstream — the real
/// beacon API also exposes `contribution_and_proof` and `payload_attributes`,
/// which are deliberately excluded (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Head,
    Block,
    Attestation,
    VoluntaryExit,
    ChainReorg,
    FinalizedCheckpoint,
}

impl EventTopic {
    pub const ALL: [EventTopic; 6] = [
        EventTopic::Head,
        EventTopic::Block,
        EventTopic::Attestation,
        EventTopic::VoluntaryExit,
        EventTopic::ChainReorg,
        EventTopic::FinalizedCheckpoint,
    ];
}

impl FromStr for EventTopic {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(EventTopic::Head),
            "block" => Ok(EventTopic::Block),
            "attestation" => Ok(EventTopic::Attestation),
            "voluntary_exit" => Ok(EventTopic::VoluntaryExit),
            "chain_reorg" => Ok(EventTopic::ChainReorg),
            "finalized_checkpoint" => Ok(EventTopic::FinalizedCheckpoint),
            _ => Err(format!("unknown event topic: {}", s)),
        }
    }
}

impl fmt::Display for EventTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventTopic::Head => "head",
            EventTopic::Block => "block",
            EventTopic::Attestation => "attestation",
            EventTopic::VoluntaryExit => "voluntary_exit",
            EventTopic::ChainReorg => "chain_reorg",
            EventTopic::FinalizedCheckpoint => "finalized_checkpoint",
        };
        write!(f, "{}", s)
    }
}

/// A raw SSE payload, decoded into its topic-tagged variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    Head(SseHead),
    Block(SseBlock),
    Attestation(SseAttestation),
    VoluntaryExit(SseVoluntaryExit),
    ChainReorg(SseChainReorg),
    FinalizedCheckpoint(SseFinalizedCheckpoint),
}

/// Errors decoding an individual SSE frame. Malformed payloads are skipped
/// by the caller, not fatal (spec.md §4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum SseDecodeError {
    MissingEventTag,
    MissingDataTag,
    UnknownTopic(String),
    InvalidJson(String),
}

impl fmt::Display for SseDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SseDecodeError::MissingEventTag => write!(f, "could not parse event tag"),
            SseDecodeError::MissingDataTag => write!(f, "could not parse data tag"),
            SseDecodeError::UnknownTopic(t) => write!(f, "unknown event topic: {}", t),
            SseDecodeError::InvalidJson(e) => write!(f, "invalid event payload: {}", e),
        }
    }
}
impl std::error::Error for SseDecodeError {}

impl RawEvent {
    /// Parses an SSE frame of the form `event:<topic>\ndata:<json>`, as
    /// Lighthouse's own `EventKind::from_sse_bytes` does.
    pub fn from_sse_message(event_field: &str, data_field: &str) -> Result<Self, SseDecodeError> {
        let event = event_field.trim_start_matches("event:").trim();
        let data = data_field.trim_start_matches("data:").trim();

        let parse = |s: &str| serde_json::from_str(s).map_err(|e| SseDecodeError::InvalidJson(e.to_string()));

        match event {
            "head" => Ok(RawEvent::Head(parse(data)?)),
            "block" => Ok(RawEvent::Block(parse(data)?)),
            "attestation" => Ok(RawEvent::Attestation(parse(data)?)),
            "voluntary_exit" => Ok(RawEvent::VoluntaryExit(parse(data)?)),
            "chain_reorg" => Ok(RawEvent::ChainReorg(parse(data)?)),
            "finalized_checkpoint" => Ok(RawEvent::FinalizedCheckpoint(parse(data)?)),
            other => Err(SseDecodeError::UnknownTopic(other.to_string())),
        }
    }

    pub fn from_sse_bytes(message: &[u8]) -> Result<Self, SseDecodeError> {
        let s = std::str::from_utf8(message).map_err(|_| SseDecodeError::MissingEventTag)?;
        let mut lines = s.splitn(2, '\n');
        let event_field = lines.next().ok_or(SseDecodeError::MissingEventTag)?;
        let data_field = lines.next().ok_or(SseDecodeError::MissingDataTag)?;
        Self::from_sse_message(event_field, data_field)
    }
}

/// `serde_utils::quoted_u64`-equivalent: upstream always quotes large
/// integers as strings to dodge JS's 2^53 precision ceiling.
pub mod quoted_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Accepts either a quoted string or a bare number for a `u64` field.
pub mod lenient_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().map_err(de::Error::custom),
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| de::Error::custom("number is not a valid u64")),
            other => Err(de::Error::custom(format!(
                "expected string or number, got {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_round_trips() {
        assert_eq!(BlockId::from_str("head"), Ok(BlockId::Head));
        assert_eq!(BlockId::from_str("123"), Ok(BlockId::Slot(Slot::new(123))));
        assert_eq!(BlockId::Head.to_string(), "head");
    }

    #[test]
    fn peer_count_accepts_strings_and_numbers() {
        let from_strings: PeerCount =
            serde_json::from_str(r#"{"connected":"3","connecting":"0","disconnected":"1","disconnecting":"0"}"#)
                .unwrap();
        let from_numbers: PeerCount =
            serde_json::from_str(r#"{"connected":3,"connecting":0,"disconnected":1,"disconnecting":0}"#)
                .unwrap();
        assert_eq!(from_strings, from_numbers);
    }

    #[test]
    fn sse_block_event_parses() {
        let frame = b"event: block\ndata: {\"slot\":10,\"block\":\"0x0000000000000000000000000000000000000000000000000000000000000a\"}";
        let event = RawEvent::from_sse_bytes(frame).unwrap();
        match event {
            RawEvent::Block(b) => assert_eq!(b.slot, Slot::new(10)),
            _ => panic!("expected a block event"),
        }
    }

    #[test]
    fn unknown_topic_is_an_error_not_a_panic() {
        let frame = b"event: contribution_and_proof\ndata: {}";
        assert!(matches!(
            RawEvent::from_sse_bytes(frame),
            Err(SseDecodeError::UnknownTopic(_))
        ));
    }
}
