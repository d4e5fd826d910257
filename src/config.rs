//! Configuration loading for the report tool.
//!
//! ```toml
//! peers = ["raft@10.0.0.1", "raft@10.0.0.2", "local"]
//! log-file = "election.log"
//! kill-mode = true
//! ```

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::Path;

use crate::analyzer::{DEFAULT_MEMBERSHIP_FIELD, RunOptions};
use crate::source::Transport;

const DEFAULT_LOG_FILE: &str = "election.log";
const DEFAULT_SSH_PROGRAM: &str = "ssh";
const MAX_PEERS: usize = 1024;

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn default_membership_field() -> String {
    DEFAULT_MEMBERSHIP_FIELD.to_string()
}

fn default_ssh_program() -> String {
    DEFAULT_SSH_PROGRAM.to_string()
}

/// Where the node logs live and how to classify them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Ordered peer addresses; position `i` holds node `i`'s log under `<run>/<i+1>/`.
    #[serde(default)]
    pub peers: Vec<String>,
    /// File name of each node's log inside its directory.
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Stop each run at the first repair after an induced stop.
    #[serde(default)]
    pub kill_mode: bool,
    /// Field that marks a record as emitted by a cluster member.
    #[serde(default = "default_membership_field")]
    pub membership_field: String,
    /// Client used to reach remote peers.
    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            log_file: default_log_file(),
            kill_mode: false,
            membership_field: default_membership_field(),
            ssh_program: default_ssh_program(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    /// Check the configuration is usable for an analysis.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.peers.is_empty() {
            bail!("At least one peer is required (set `peers` in the config or pass --peers)");
        }
        if self.peers.len() > MAX_PEERS {
            bail!("Peer count {} exceeds maximum of {}", self.peers.len(), MAX_PEERS);
        }
        if let Some(index) = self.peers.iter().position(|peer| peer.trim().is_empty()) {
            bail!("Peer {} has an empty address", index + 1);
        }
        if self.log_file.trim().is_empty() {
            bail!("`log-file` must not be empty");
        }
        if self.membership_field.is_empty() {
            bail!("`membership-field` must not be empty");
        }
        if self.ssh_program.trim().is_empty() {
            bail!("`ssh-program` must not be empty");
        }
        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            kill_mode: self.kill_mode,
            membership_field: self.membership_field.clone(),
        }
    }

    pub fn transports(&self) -> Vec<Transport> {
        self.peers
            .iter()
            .map(|peer| Transport::for_peer(peer, &self.ssh_program))
            .collect()
    }

    /// Path of node `index`'s log inside a run directory.
    pub fn node_log_path(&self, run_dir: &str, index: usize) -> String {
        Path::new(run_dir)
            .join((index + 1).to_string())
            .join(&self.log_file)
            .to_string_lossy()
            .to_string()
    }
}
