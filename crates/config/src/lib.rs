use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Port B direction register on the H8/3067 (PBDDR).
pub const H8_3067_PBDDR: u64 = 0xFE_E00A;
/// Port B data register on the H8/3067 (PBDR).
pub const H8_3067_PBDR: u64 = 0xFF_FFDA;

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ManifestError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("Board '{0}' declares no ports")]
    NoPorts(String),
    #[error("Port id '{0}' is declared more than once")]
    DuplicatePort(String),
    #[error("Register address {0:#x} is mapped more than once")]
    DuplicateAddress(u64),
    #[error("Port '{0}' uses the same address for DDR and DR")]
    OverlappingRegisters(String),
    #[error("driver_port '{0}' does not name a declared port")]
    UnknownDriverPort(String),
    #[error("Limits must set max_toggles or wall_time_ms, otherwise the run never stops")]
    Unbounded,
    #[error("Limit 'max_toggles' must be greater than zero")]
    ZeroToggles,
    #[error("Board 'history_limit' must be greater than zero")]
    ZeroHistory,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PortConfig {
    pub id: String,
    pub ddr_address: u64,
    pub dr_address: u64,
}

/// Plain byte-wide register with no peripheral behind it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegisterConfig {
    pub name: String,
    pub address: u64,
    #[serde(default)]
    pub reset: u8,
}

pub const DEFAULT_HISTORY_LIMIT: usize = 64;

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoardManifest {
    pub name: String,
    pub ports: Vec<PortConfig>,
    #[serde(default)]
    pub registers: Vec<RegisterConfig>,
    pub driver_port: String,
    /// Most recent port writes kept per port.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl BoardManifest {
    pub fn h8_3067() -> Self {
        Self {
            name: "h8-3067".to_string(),
            ports: vec![PortConfig {
                id: "port_b".to_string(),
                ddr_address: H8_3067_PBDDR,
                dr_address: H8_3067_PBDR,
            }],
            registers: Vec::new(),
            driver_port: "port_b".to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn driver_port(&self) -> Option<&PortConfig> {
        self.ports.iter().find(|p| p.id == self.driver_port)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DelayKind {
    Busy,
    Sleep,
    #[default]
    None,
}

impl std::str::FromStr for DelayKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "busy" => Ok(Self::Busy),
            "sleep" => Ok(Self::Sleep),
            "none" => Ok(Self::None),
            other => anyhow::bail!("Unknown delay strategy '{}' (expected busy, sleep or none)", other),
        }
    }
}

fn default_iteration_ns() -> u64 {
    66
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    #[serde(default)]
    pub strategy: DelayKind,
    /// Host time charged per counted iteration by the `sleep` strategy.
    #[serde(default = "default_iteration_ns")]
    pub iteration_ns: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            strategy: DelayKind::None,
            iteration_ns: default_iteration_ns(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    #[serde(default)]
    pub max_toggles: Option<u64>,
    #[serde(default)]
    pub wall_time_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub schema_version: String,
    pub board: BoardManifest,
    #[serde(default)]
    pub delay: DelayConfig,
    #[serde(default)]
    pub limits: RunLimits,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            board: BoardManifest::h8_3067(),
            delay: DelayConfig::default(),
            limits: RunLimits {
                max_toggles: Some(5),
                wall_time_ms: None,
            },
        }
    }
}

impl Manifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open manifest at {:?}", path.as_ref()))?;
        let manifest: Self =
            serde_yaml::from_reader(f).context("Failed to parse PortBlink manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse PortBlink manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> std::result::Result<(), ManifestError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ManifestError::UnsupportedSchema(self.schema_version.clone()));
        }

        if self.board.ports.is_empty() {
            return Err(ManifestError::NoPorts(self.board.name.clone()));
        }

        let mut ids = HashSet::new();
        let mut addresses = HashSet::new();
        for port in &self.board.ports {
            if !ids.insert(port.id.as_str()) {
                return Err(ManifestError::DuplicatePort(port.id.clone()));
            }
            if port.ddr_address == port.dr_address {
                return Err(ManifestError::OverlappingRegisters(port.id.clone()));
            }
            for addr in [port.ddr_address, port.dr_address] {
                if !addresses.insert(addr) {
                    return Err(ManifestError::DuplicateAddress(addr));
                }
            }
        }

        for reg in &self.board.registers {
            if !addresses.insert(reg.address) {
                return Err(ManifestError::DuplicateAddress(reg.address));
            }
        }

        if self.board.history_limit == 0 {
            return Err(ManifestError::ZeroHistory);
        }

        if self.board.driver_port().is_none() {
            return Err(ManifestError::UnknownDriverPort(self.board.driver_port.clone()));
        }

        match (self.limits.max_toggles, self.limits.wall_time_ms) {
            (None, None) => return Err(ManifestError::Unbounded),
            (Some(0), _) => return Err(ManifestError::ZeroToggles),
            _ => {}
        }

        Ok(())
    }
}
