// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Defines the configuration schema consumed by the hook pipeline:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Host identity and default block size for queued transfers
// - Global store/retrieve execution specifications
// - Admission limits and sampler selection
// - Storage backend, rule seeds for the in-memory store, per-user overrides

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::admission::AdmissionLimits;
use crate::domain::handoff::{TransferRule, MIN_BLOCK_SIZE};
use crate::domain::policy::{ExecutionPolicySet, PolicyError};
use crate::domain::repository::StorageBackend;

pub const API_VERSION: &str = "relaygate.io/v1";
pub const KIND: &str = "GatewayConfig";
pub const CONFIG_PATH_ENV: &str = "RELAYGATE_CONFIG_PATH";

/// Top-level Kubernetes-style gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigManifest {
    /// API version (must be "relaygate.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GatewayConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: GatewayConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfigSpec {
    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub admission: AdmissionLimits,

    #[serde(default)]
    pub storage: StorageBackend,

    /// Rules loaded into the in-memory rule store; ignored with PostgreSQL
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<TransferRule>,

    /// Per-user overrides keyed by user name
    #[serde(default)]
    pub users: HashMap<String, UserConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Host id recorded as requester of queued transfers
    pub id: String,

    /// Block size used when `-block` is absent or too small
    #[serde(default = "default_block_size")]
    pub default_block_size: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        let id = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "relaygate".to_string());
        Self {
            id,
            default_block_size: default_block_size(),
        }
    }
}

/// Global execution specifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Specification applied after STOR/APPE/STOU
    #[serde(default)]
    pub store: String,

    #[serde(default, with = "humantime_serde")]
    pub store_timeout: Duration,

    /// Specification applied before RETR
    #[serde(default)]
    pub retrieve: String,

    #[serde(default, with = "humantime_serde")]
    pub retrieve_timeout: Duration,

    /// Delay before the single retry of a transiently failed spawn
    #[serde(default = "default_spawn_retry_delay", with = "humantime_serde")]
    pub spawn_retry_delay: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            store: String::new(),
            store_timeout: Duration::ZERO,
            retrieve: String::new(),
            retrieve_timeout: Duration::ZERO,
            spawn_retry_delay: default_spawn_retry_delay(),
        }
    }
}

impl ExecutionConfig {
    pub fn policies(&self) -> Result<ExecutionPolicySet, PolicyError> {
        ExecutionPolicySet::parse(&self.store, self.store_timeout, &self.retrieve, self.retrieve_timeout)
    }
}

/// Per-user override. An empty or `NONE` specification defers to the
/// global one for that direction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub account: Option<String>,

    #[serde(default)]
    pub admin: bool,

    #[serde(default)]
    pub store: String,

    #[serde(default, with = "humantime_serde")]
    pub store_timeout: Duration,

    #[serde(default)]
    pub retrieve: String,

    #[serde(default, with = "humantime_serde")]
    pub retrieve_timeout: Duration,
}

impl UserConfig {
    pub fn policies(&self) -> Result<ExecutionPolicySet, PolicyError> {
        ExecutionPolicySet::parse(&self.store, self.store_timeout, &self.retrieve, self.retrieve_timeout)
    }
}

fn default_block_size() -> u32 {
    65536
}

fn default_spawn_retry_delay() -> Duration {
    Duration::from_millis(100)
}

impl Default for GatewayConfigManifest {
    fn default() -> Self {
        let spec = GatewayConfigSpec::default();
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: spec.host.id.clone(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec,
        }
    }
}

impl GatewayConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. RELAYGATE_CONFIG_PATH environment variable
    /// 2. ./relaygate-config.yaml (working directory)
    /// 3. ~/.relaygate/config.yaml (user home)
    /// 4. /etc/relaygate/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./relaygate-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".relaygate").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/relaygate/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RELAYGATE_CPU_LIMIT") {
            match val.parse::<f64>() {
                Ok(limit) => {
                    tracing::info!("Environment override: RELAYGATE_CPU_LIMIT={}", limit);
                    self.spec.admission.cpu_limit = limit;
                }
                Err(_) => {
                    tracing::warn!("Invalid value for RELAYGATE_CPU_LIMIT: '{}'. Ignoring.", val);
                }
            }
        }

        if let Ok(val) = std::env::var("RELAYGATE_CONNECTION_LIMIT") {
            match val.parse::<u64>() {
                Ok(limit) => {
                    tracing::info!("Environment override: RELAYGATE_CONNECTION_LIMIT={}", limit);
                    self.spec.admission.connection_limit = limit;
                }
                Err(_) => {
                    tracing::warn!("Invalid value for RELAYGATE_CONNECTION_LIMIT: '{}'. Ignoring.", val);
                }
            }
        }
    }

    /// Parsed per-user overrides
    pub fn user_policies(&self) -> Result<HashMap<String, ExecutionPolicySet>, PolicyError> {
        self.spec
            .users
            .iter()
            .map(|(name, user)| Ok((name.clone(), user.policies()?)))
            .collect()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.host.id.is_empty() {
            anyhow::bail!("spec.host.id cannot be empty");
        }

        if self.spec.host.default_block_size < MIN_BLOCK_SIZE {
            anyhow::bail!(
                "spec.host.default_block_size must be at least {}, got {}",
                MIN_BLOCK_SIZE,
                self.spec.host.default_block_size
            );
        }

        let cpu_limit = self.spec.admission.cpu_limit;
        if !(0.0..=1.0).contains(&cpu_limit) {
            anyhow::bail!("spec.admission.cpu_limit must be within [0, 1], got {}", cpu_limit);
        }

        if let StorageBackend::Postgres(pg) = &self.spec.storage {
            if pg.connection_string.is_empty() {
                anyhow::bail!("spec.storage.connection_string cannot be empty");
            }
        }

        self.spec
            .execution
            .policies()
            .map_err(|e| anyhow::anyhow!("spec.execution: {}", e))?;

        for rule in &self.spec.rules {
            if rule.name.is_empty() {
                anyhow::bail!("spec.rules contains a rule without a name");
            }
        }

        for (name, user) in &self.spec.users {
            if name.is_empty() {
                anyhow::bail!("spec.users contains an empty user name");
            }
            user.policies()
                .map_err(|e| anyhow::anyhow!("spec.users.{}: {}", name, e))?;
        }

        Ok(())
    }
}
