//! YAML configuration tree (spec.md §6's enumerated top-level keys), loaded
//! with `serde_yaml` the same way the teacher's `client_config` loads its
//! own on-disk configuration.

use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::Path;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    MissingExecutionUrl,
    MissingConsensusUrl,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "could not read config file: {}", e),
            Error::Parse(e) => write!(f, "could not parse config file: {}", e),
            Error::MissingExecutionUrl => write!(f, "execution.enabled is true but execution.url is missing"),
            Error::MissingConsensusUrl => write!(f, "consensus.enabled is true but consensus.url is missing"),
        }
    }
}
impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Parse(e)
    }
}

fn default_true() -> bool {
    true
}

fn default_node_name() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_node_name")]
    pub name: String,
    pub url: Option<String>,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventStreamConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_event_topics")]
    pub topics: Vec<String>,
}

fn default_event_topics() -> Vec<String> {
    vec![
        "head".to_string(),
        "block".to_string(),
        "chain_reorg".to_string(),
        "finalized_checkpoint".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_node_name")]
    pub name: String,
    pub url: Option<String>,
    #[serde(default, rename = "eventStream")]
    pub event_stream: Option<EventStreamConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskUsageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default = "default_disk_interval_secs")]
    pub interval: u64,
}

fn default_disk_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub enabled: bool,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub containers: Vec<String>,
    #[serde(default = "default_disk_interval_secs")]
    pub interval: u64,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub execution: Option<ExecutionConfig>,
    pub consensus: Option<ConsensusConfig>,
    #[serde(default, rename = "diskUsage")]
    pub disk_usage: Option<DiskUsageConfig>,
    #[serde(default)]
    pub docker: Option<DockerConfig>,
    #[serde(default)]
    pub pair: Option<PairConfig>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if let Some(execution) = &self.execution {
            if execution.enabled && execution.url.is_none() {
                return Err(Error::MissingExecutionUrl);
            }
        }
        if let Some(consensus) = &self.consensus {
            if consensus.enabled && consensus.url.is_none() {
                return Err(Error::MissingConsensusUrl);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_minimal_consensus_only_config() {
        let yaml = r#"
consensus:
  enabled: true
  name: geth-lighthouse
  url: http://localhost:5052
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert!(config.consensus.unwrap().enabled);
        assert!(config.execution.is_none());
    }

    #[test]
    fn rejects_enabled_execution_without_url() {
        let yaml = r#"
execution:
  enabled: true
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::MissingExecutionUrl)
        ));
    }
}
