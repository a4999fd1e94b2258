//! Node configuration file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tessera_types::Timestamp;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TESSERA_DATA_DIR";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Block production settings.
    #[serde(default)]
    pub chain: ChainConfig,
    /// Initial state.
    #[serde(default)]
    pub genesis: GenesisConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Block production configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Genesis time used when no genesis file is configured.
    #[serde(default = "default_genesis_time")]
    pub genesis_time: Timestamp,
    /// Seconds between blocks, both on the chain clock and in wall time.
    #[serde(default = "default_block_interval")]
    pub block_interval_secs: u32,
    /// Stop after this many blocks. 0 = run until interrupted.
    #[serde(default)]
    pub max_blocks: u32,
}

/// Genesis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Genesis JSON file. Relative paths resolve against the data directory.
    /// Empty = start from an empty chain.
    #[serde(default)]
    pub path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_genesis_time() -> Timestamp {
    Timestamp::from_secs(1_700_000_000)
}

fn default_block_interval() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_time: default_genesis_time(),
            block_interval_secs: default_block_interval(),
            max_blocks: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from the data directory.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::data_dir().join("config.toml");
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)?
        } else {
            Self::default()
        };
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        anyhow::ensure!(
            config.chain.block_interval_secs > 0,
            "chain.block_interval_secs must be positive"
        );
        Ok(config)
    }

    /// Resolved genesis file path, if one is configured.
    pub fn genesis_path(&self) -> Option<PathBuf> {
        if self.genesis.path.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.genesis.path);
        if path.is_absolute() {
            Some(path)
        } else {
            Some(Self::data_dir().join(path))
        }
    }

    /// Data directory: `$TESSERA_DATA_DIR`, else `$HOME/.tessera`.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".tessera"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/tessera"))
    }
}
