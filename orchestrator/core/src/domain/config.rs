// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Haulage Configuration Types
//
// Defines the configuration schema for a haulage run, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Search traversal policy
// - Haul task executor tuning
// - Swarm run loop pacing and limits

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::reachability::Danger;

pub const API_VERSION: &str = "haulage/v1";
pub const KIND: &str = "HaulageConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaulageConfigManifest {
    /// API version (must be "haulage/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "HaulageConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: HaulageConfigSpec,
}

pub type HaulageConfig = HaulageConfigManifest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HaulageConfigSpec {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub swarm: SwarmConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Danger ceiling used when searching for items to haul.
    /// Default: deadly (loading is urgent work)
    #[serde(default = "default_haul_danger")]
    pub haul_danger: Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Pick up co-located duplicates before leaving the item's cell
    #[serde(default = "default_true")]
    pub collect_duplicates: bool,

    /// Turns to wait for another agent to leave the target cell
    /// before giving up on the task
    #[serde(default = "default_occupied_wait_turns")]
    pub occupied_wait_turns: u32,

    /// Cells walked per turn
    #[serde(default = "default_cells_per_turn")]
    pub cells_per_turn: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Delay between agent turns in milliseconds (0 = yield only)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Hard stop for a run, in turns per agent
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Turns an agent rests after finding no work
    #[serde(default = "default_idle_backoff_ticks")]
    pub idle_backoff_ticks: u32,

    /// Event bus buffer; slow subscribers lose older events
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_haul_danger() -> Danger {
    Danger::Deadly
}

fn default_occupied_wait_turns() -> u32 {
    3
}

fn default_cells_per_turn() -> u32 {
    1
}

fn default_tick_interval_ms() -> u64 {
    0
}

fn default_max_ticks() -> u64 {
    5_000
}

fn default_idle_backoff_ticks() -> u32 {
    2
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            haul_danger: default_haul_danger(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            collect_duplicates: true,
            occupied_wait_turns: default_occupied_wait_turns(),
            cells_per_turn: default_cells_per_turn(),
        }
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
            idle_backoff_ticks: default_idle_backoff_ticks(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for HaulageConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ConfigMetadata {
                name: "haulage".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: HaulageConfigSpec::default(),
        }
    }
}

impl HaulageConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate configuration paths, in precedence order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var("HAULAGE_CONFIG_PATH") {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./haulage-config.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".haulage").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/haulage/config.yaml"));
        paths
    }

    /// Discover configuration file using precedence order
    /// 1. HAULAGE_CONFIG_PATH environment variable
    /// 2. ./haulage-config.yaml (working directory)
    /// 3. ~/.haulage/config.yaml (user home)
    /// 4. /etc/haulage/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|path| path.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (Fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HAULAGE_MAX_TICKS") {
            match val.parse::<u64>() {
                Ok(ticks) => {
                    tracing::info!("Environment override: HAULAGE_MAX_TICKS={}", ticks);
                    self.spec.swarm.max_ticks = ticks;
                }
                Err(_) => {
                    tracing::warn!("Invalid value for HAULAGE_MAX_TICKS: '{}'. Ignoring.", val);
                }
            }
        }

        if let Ok(val) = std::env::var("HAULAGE_TICK_INTERVAL_MS") {
            match val.parse::<u64>() {
                Ok(ms) => {
                    tracing::info!("Environment override: HAULAGE_TICK_INTERVAL_MS={}", ms);
                    self.spec.swarm.tick_interval_ms = ms;
                }
                Err(_) => {
                    tracing::warn!("Invalid value for HAULAGE_TICK_INTERVAL_MS: '{}'. Ignoring.", val);
                }
            }
        }

        if let Ok(val) = std::env::var("HAULAGE_COLLECT_DUPLICATES") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => self.spec.executor.collect_duplicates = true,
                "false" | "0" | "no" | "off" => self.spec.executor.collect_duplicates = false,
                _ => {
                    tracing::warn!(
                        "Invalid value for HAULAGE_COLLECT_DUPLICATES: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.executor.cells_per_turn == 0 {
            anyhow::bail!("spec.executor.cells_per_turn must be at least 1");
        }

        if self.spec.swarm.max_ticks == 0 {
            anyhow::bail!("spec.swarm.max_ticks must be at least 1");
        }

        if self.spec.swarm.event_bus_capacity == 0 {
            anyhow::bail!("spec.swarm.event_bus_capacity must be at least 1");
        }

        Ok(())
    }
}
