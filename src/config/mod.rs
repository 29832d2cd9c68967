use crate::util::errors::{NodeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Node configuration loaded from a TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique identifier for this node
    pub node_id: String,
    /// Address both listeners bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port for Raft RPCs
    pub raft_port: u16,
    /// HTTP port for the status monitor
    pub monitor_port: u16,
    /// Directory for persistent state and stored files
    pub data_dir: PathBuf,
    /// Addresses of the other replicas. This node never dials out; the
    /// list is recorded for operators reading the logs.
    #[serde(default)]
    pub peers: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl NodeConfig {
    /// Load and validate node configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| NodeError::InvalidConfig(format!("failed to read config file: {}", e)))?;

        let config: NodeConfig = toml::from_str(&contents)
            .map_err(|e| NodeError::InvalidConfig(format!("failed to parse config file: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.is_empty() {
            return Err(NodeError::InvalidConfig(
                "node_id cannot be empty".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(NodeError::InvalidConfig("host cannot be empty".to_string()));
        }

        if self.raft_port == self.monitor_port {
            return Err(NodeError::InvalidConfig(
                "raft_port and monitor_port must differ".to_string(),
            ));
        }

        Ok(())
    }

    pub fn raft_addr(&self) -> String {
        format!("{}:{}", self.host, self.raft_port)
    }

    pub fn monitor_addr(&self) -> String {
        format!("{}:{}", self.host, self.monitor_port)
    }
}
