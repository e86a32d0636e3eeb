use serde::Deserialize;
use std::path::PathBuf;

/// Top-level node configuration, loaded from a TOML file.
#[derive(Deserialize, Debug, Clone)]
pub struct NodeConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StorageConfig {
    /// Base path for the sled database
    pub path: PathBuf,
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sled,
    Memory,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LedgerConfig {
    /// Endpoint of a remote read-only ledger client. Absent means the
    /// in-process ledger, which is only suitable for local runs.
    pub endpoint: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReconciliationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between reconciliation sweeps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Minimum age, in seconds, before an unanchored affidavit is swept
    #[serde(default = "default_min_age_secs")]
    pub min_age_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    300
}

fn default_min_age_secs() -> u64 {
    600
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_interval_secs(),
            min_age_secs: default_min_age_secs(),
        }
    }
}

/// Global CLI args for the node service.
#[derive(Debug)]
pub struct CliArgs {
    pub config_path: String,
}

impl CliArgs {
    pub fn parse() -> Self {
        let config_path = std::env::var("ATTESTA_NODE_CONFIG_PATH")
            .unwrap_or_else(|_| "attesta.toml".to_string());
        Self { config_path }
    }
}

/// Load a node configuration from a TOML file.
pub fn load_node_config(path: &str) -> anyhow::Result<NodeConfig> {
    let config_content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file from {}: {}", path, e))?;
    let config: NodeConfig = toml::from_str(&config_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse TOML config from {}: {}", path, e))?;
    Ok(config)
}
