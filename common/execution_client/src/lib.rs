//! A minimal JSON-RPC 2.0 client over an execution client's HTTP endpoint.
//!
//! Styled after `eth2_client::client`'s REST wrapper: one `call` primitive,
//! typed methods layered on top, a hand-rolled `Error` enum rather than
//! `anyhow`/`thiserror`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum Error {
    Reqwest(reqwest::Error),
    StatusError { code: u16 },
    /// The server's JSON-RPC envelope carried an `error` object.
    JsonRpc { code: i64, message: String },
    Decode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Reqwest(e) => write!(f, "request failed: {}", e),
            Error::StatusError { code } => write!(f, "server returned status {}", code),
            Error::JsonRpc { code, message } => write!(f, "rpc error {}: {}", code, message),
            Error::Decode(s) => write!(f, "could not decode response: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Reqwest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Reqwest(e)
    }
}

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct Response {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// A JSON-RPC 2.0 client bound to one execution node's endpoint. Cheaply
/// cloneable: the underlying `reqwest::Client` is itself a pooled handle,
/// and the request-id counter is shared across clones so concurrent callers
/// never collide.
#[derive(Clone)]
pub struct ExecutionClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    next_id: Arc<AtomicU64>,
}

impl ExecutionClient {
    pub fn new(endpoint: reqwest::Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client config is static and known-valid");
        Self {
            client,
            endpoint,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let http_response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(Error::StatusError {
                code: status.as_u16(),
            });
        }

        let response: Response = http_response
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;

        if let Some(err) = response.error {
            return Err(Error::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| Error::Decode("response carried neither result nor error".to_string()))?;

        serde_json::from_value(result).map_err(|e| Error::Decode(e.to_string()))
    }

    pub async fn eth_block_number(&self) -> Result<u64, Error> {
        let hex: String = self.call("eth_blockNumber", Value::Array(vec![])).await?;
        parse_hex_quantity(&hex).map_err(Error::Decode)
    }

    pub async fn eth_gas_price(&self) -> Result<u64, Error> {
        let hex: String = self.call("eth_gasPrice", Value::Array(vec![])).await?;
        parse_hex_quantity(&hex).map_err(Error::Decode)
    }

    pub async fn eth_chain_id(&self) -> Result<u64, Error> {
        let hex: String = self.call("eth_chainId", Value::Array(vec![])).await?;
        parse_hex_quantity(&hex).map_err(Error::Decode)
    }

    pub async fn net_version(&self) -> Result<String, Error> {
        self.call("net_version", Value::Array(vec![])).await
    }

    pub async fn net_peer_count(&self) -> Result<u64, Error> {
        let hex: String = self.call("net_peerCount", Value::Array(vec![])).await?;
        parse_hex_quantity(&hex).map_err(Error::Decode)
    }

    pub async fn web3_client_version(&self) -> Result<String, Error> {
        self.call("web3_clientVersion", Value::Array(vec![])).await
    }

    /// Returns `false` when not syncing, or the sync progress object when it is.
    pub async fn eth_syncing(&self) -> Result<SyncingStatus, Error> {
        self.call("eth_syncing", Value::Array(vec![])).await
    }

    pub async fn admin_node_info(&self) -> Result<Value, Error> {
        self.call("admin_nodeInfo", Value::Array(vec![])).await
    }

    pub async fn admin_peers(&self) -> Result<Vec<Value>, Error> {
        self.call("admin_peers", Value::Array(vec![])).await
    }

    pub async fn txpool_status(&self) -> Result<TxPoolStatus, Error> {
        self.call("txpool_status", Value::Array(vec![])).await
    }

    pub async fn eth_get_block_by_number(
        &self,
        number: &str,
        full_transactions: bool,
    ) -> Result<Option<Value>, Error> {
        self.call(
            "eth_getBlockByNumber",
            serde_json::json!([number, full_transactions]),
        )
        .await
    }

    pub async fn eth_call(&self, call_object: Value, block: &str) -> Result<String, Error> {
        self.call("eth_call", serde_json::json!([call_object, block]))
            .await
    }

    pub async fn eth_get_balance(&self, address: &str, block: &str) -> Result<u64, Error> {
        let hex: String = self
            .call("eth_getBalance", serde_json::json!([address, block]))
            .await?;
        parse_hex_quantity(&hex).map_err(Error::Decode)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SyncingStatus {
    NotSyncing(bool),
    Syncing(SyncProgress),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncProgress {
    #[serde(rename = "startingBlock")]
    pub starting_block: String,
    #[serde(rename = "currentBlock")]
    pub current_block: String,
    #[serde(rename = "highestBlock")]
    pub highest_block: String,
}

/// The transaction pool's pending/queued counts. Some execution clients
/// serialize these as `0x`-prefixed hex, others as bare decimal numbers —
/// both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TxPoolStatus {
    #[serde(deserialize_with = "deserialize_hex_or_decimal")]
    pub pending: u64,
    #[serde(deserialize_with = "deserialize_hex_or_decimal")]
    pub queued: u64,
}

fn deserialize_hex_or_decimal<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => parse_hex_or_decimal_str(&s).map_err(D::Error::custom),
        Value::Number(n) => {
            let i = n
                .as_i64()
                .ok_or_else(|| D::Error::custom("number is not a valid i64"))?;
            if i < 0 {
                return Err(D::Error::custom("value must not be negative"));
            }
            Ok(i as u64)
        }
        other => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

fn parse_hex_or_decimal_str(s: &str) -> Result<u64, String> {
    if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(stripped, 16).map_err(|e| format!("invalid hex quantity {:?}: {}", s, e))
    } else {
        s.parse::<u64>()
            .map_err(|e| format!("invalid decimal quantity {:?}: {}", s, e))
    }
}

fn parse_hex_quantity(s: &str) -> Result<u64, String> {
    let stripped = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| format!("quantity {:?} is not 0x-prefixed", s))?;
    u64::from_str_radix(stripped, 16).map_err(|e| format!("invalid hex quantity {:?}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txpool_status_accepts_hex_strings() {
        let status: TxPoolStatus =
            serde_json::from_str(r#"{"pending":"0x128","queued":"0x0"}"#).unwrap();
        assert_eq!(status, TxPoolStatus { pending: 296, queued: 0 });
    }

    #[test]
    fn txpool_status_accepts_decimal_numbers() {
        let status: TxPoolStatus =
            serde_json::from_str(r#"{"pending":16,"queued":0}"#).unwrap();
        assert_eq!(status, TxPoolStatus { pending: 16, queued: 0 });
    }

    #[test]
    fn txpool_status_accepts_mixed_shapes() {
        let status: TxPoolStatus =
            serde_json::from_str(r#"{"pending":"0x10","queued":5}"#).unwrap();
        assert_eq!(status, TxPoolStatus { pending: 16, queued: 5 });
    }

    #[test]
    fn txpool_status_rejects_negative_numbers() {
        let result: Result<TxPoolStatus, _> =
            serde_json::from_str(r#"{"pending":-1,"queued":0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn txpool_status_rejects_non_hex_strings() {
        let result: Result<TxPoolStatus, _> =
            serde_json::from_str(r#"{"pending":"not-a-number","queued":0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn eth_syncing_false_decodes_as_not_syncing() {
        let status: SyncingStatus = serde_json::from_str("false").unwrap();
        assert_eq!(status, SyncingStatus::NotSyncing(false));
    }

    #[test]
    fn eth_syncing_progress_object_decodes() {
        let status: SyncingStatus = serde_json::from_str(
            r#"{"startingBlock":"0x0","currentBlock":"0x10","highestBlock":"0x100"}"#,
        )
        .unwrap();
        assert!(matches!(status, SyncingStatus::Syncing(_)));
    }
}
