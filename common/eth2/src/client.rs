//! A thin REST client over the beacon node's `/eth/v1/...` surface.
//!
//! Mirrors the request/response shape of Lighthouse's own `eth2::BeaconNodeHttpClient`
//! (one method per endpoint, `{"data": T}` envelope unwrapped internally,
//! non-2xx turned into a typed error) but trimmed to exactly the endpoints
//! this daemon polls.

use crate::types::*;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum Error {
    Reqwest(reqwest::Error),
    /// The server responded with a non-2xx status.
    StatusError { code: u16, url: String },
    InvalidUrl(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Reqwest(e) => write!(f, "request failed: {}", e),
            Error::StatusError { code, url } => {
                write!(f, "server returned status {} for {}", code, url)
            }
            Error::InvalidUrl(s) => write!(f, "invalid url: {}", s),
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

/// A REST client bound to one beacon node's base URL.
#[derive(Clone)]
pub struct BeaconNodeHttpClient {
    client: reqwest::Client,
    server: reqwest::Url,
}

impl BeaconNodeHttpClient {
    pub fn new(server: reqwest::Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client config is static and known-valid");
        Self { client, server }
    }

    pub fn server_url(&self) -> &reqwest::Url {
        &self.server
    }

    fn join(&self, path: &str) -> Result<reqwest::Url, Error> {
        self.server
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.join(path)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::StatusError {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    async fn get_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, Error> {
        let url = self.join(path)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::StatusError {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Some(response.json().await?))
    }

    pub async fn get_node_version(&self) -> Result<VersionData, Error> {
        let resp: GenericResponse<VersionData> = self.get("eth/v1/node/version").await?;
        Ok(resp.data)
    }

    pub async fn get_node_syncing(&self) -> Result<SyncingData, Error> {
        let resp: GenericResponse<SyncingData> = self.get("eth/v1/node/syncing").await?;
        Ok(resp.data)
    }

    pub async fn get_node_peers(&self) -> Result<Vec<PeerData>, Error> {
        let resp: GenericResponse<Vec<PeerData>> = self.get("eth/v1/node/peers").await?;
        Ok(resp.data)
    }

    pub async fn get_node_peer(&self, peer_id: &str) -> Result<Option<PeerData>, Error> {
        let path = format!("eth/v1/node/peers/{}", peer_id);
        let resp: Option<GenericResponse<PeerData>> = self.get_opt(&path).await?;
        Ok(resp.map(|r| r.data))
    }

    pub async fn get_node_peer_count(&self) -> Result<PeerCount, Error> {
        let resp: GenericResponse<PeerCount> = self.get("eth/v1/node/peer_count").await?;
        Ok(resp.data)
    }

    pub async fn get_config_spec(&self) -> Result<std::collections::BTreeMap<String, serde_json::Value>, Error> {
        let resp: GenericResponse<std::collections::BTreeMap<String, serde_json::Value>> =
            self.get("eth/v1/config/spec").await?;
        Ok(resp.data)
    }

    pub async fn get_beacon_genesis(&self) -> Result<GenesisData, Error> {
        let resp: GenericResponse<GenesisData> = self.get("eth/v1/beacon/genesis").await?;
        Ok(resp.data)
    }

    pub async fn get_beacon_block(&self, block_id: BlockId) -> Result<Option<SignedBeaconBlock>, Error> {
        let path = format!("eth/v2/beacon/blocks/{}", block_id);
        let resp: Option<GenericResponse<SignedBeaconBlock>> = self.get_opt(&path).await?;
        Ok(resp.map(|r| r.data))
    }

    pub async fn get_beacon_block_header(
        &self,
        block_id: BlockId,
    ) -> Result<Option<BlockHeaderData>, Error> {
        let path = format!("eth/v1/beacon/headers/{}", block_id);
        let resp: Option<GenericResponse<BlockHeaderData>> = self.get_opt(&path).await?;
        Ok(resp.map(|r| r.data))
    }

    pub async fn get_beacon_finality_checkpoints(
        &self,
        state_id: StateId,
    ) -> Result<FinalityCheckpointsData, Error> {
        let path = format!("eth/v1/beacon/states/{}/finality_checkpoints", state_id);
        let resp: GenericResponse<FinalityCheckpointsData> = self.get(&path).await?;
        Ok(resp.data)
    }

    pub async fn get_validator_duties_proposer(
        &self,
        epoch: slot_clock::Epoch,
    ) -> Result<DutiesResponse<Vec<ProposerData>>, Error> {
        let path = format!("eth/v1/validator/duties/proposer/{}", epoch);
        self.get(&path).await
    }

    /// Base URL used as the SSE event stream endpoint, with the requested
    /// topics as query parameters.
    pub fn events_url(&self, topics: &[EventTopic]) -> Result<reqwest::Url, Error> {
        let mut url = self.join("eth/v1/events")?;
        let topics_csv = topics
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");
        url.query_pairs_mut().append_pair("topics", &topics_csv);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_url_encodes_requested_topics() {
        let client = BeaconNodeHttpClient::new(reqwest::Url::parse("http://localhost:5052/").unwrap());
        let url = client
            .events_url(&[EventTopic::Head, EventTopic::Block])
            .unwrap();
        assert_eq!(url.path(), "/eth/v1/events");
        assert!(url.query().unwrap().contains("topics=head%2Cblock"));
    }
}
