//! Optimizer configuration.
//!
//! Loaded from a TOML file with `[search]`, `[weights]` and `[server]` tables. Every
//! field has a default, so an empty file (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SlotFinderError, SlotFinderResult};
use crate::schedule::scorer::ScoringWeights;

/// Hard upper bound on students moved by one displacement chain
pub const MAX_CHAIN_DEPTH: usize = 3;

/// Longest time budget a search may be given (one day)
pub const MAX_TIME_BUDGET_SECS: u64 = 86_400;

/// Upper bound on any single scoring weight
pub const MAX_WEIGHT: u32 = 10_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotFinderConfig {
    pub search: SearchConfig,
    pub weights: ScoringWeights,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Recommendations returned when the request does not say otherwise
    pub max_results: usize,
    pub include_displacements: bool,
    /// Wall-clock budget for one search when the caller gives no deadline
    pub time_budget_secs: u64,
    /// Safe-point budget (groups, occupants and chain steps visited)
    pub max_steps: u64,
    /// Students a displacement chain may move, 1..=3
    pub max_chain_depth: usize,
    /// Maximum distance between a student's year level and a group's average.
    /// `None` disables the check.
    pub max_year_gap: Option<u8>,
    /// Feasibility points lost per displaced student
    pub displacement_penalty: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            include_displacements: true,
            time_budget_secs: 120,
            max_steps: 250_000,
            max_chain_depth: MAX_CHAIN_DEPTH,
            max_year_gap: Some(2),
            displacement_penalty: 25,
        }
    }
}

impl SearchConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl SlotFinderConfig {
    pub fn from_toml_str(content: &str) -> SlotFinderResult<Self> {
        let config: SlotFinderConfig = toml::from_str(content).map_err(|e| {
            SlotFinderError::Configuration(format!("Failed to parse config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SlotFinderResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SlotFinderError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration the way the binary does:
    /// 1. `SLOT_FINDER_CONFIG` if set
    /// 2. `slot_finder.toml` or `config/slot_finder.toml` in the working directory
    /// 3. built-in defaults
    ///
    /// Environment overrides (`HOST`, `PORT`, `SLOT_FINDER_TIME_BUDGET_SECS`) are applied last.
    pub fn load() -> SlotFinderResult<Self> {
        let mut config = match env::var("SLOT_FINDER_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => {
                let search_paths = [
                    PathBuf::from("slot_finder.toml"),
                    PathBuf::from("config/slot_finder.toml"),
                ];
                match search_paths.iter().find(|p| p.exists()) {
                    Some(path) => Self::from_file(path)?,
                    None => Self::default(),
                }
            }
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> SlotFinderResult<()> {
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            self.server.port = port.parse().map_err(|_| {
                SlotFinderError::Configuration("PORT must be a valid port number".to_string())
            })?;
        }
        if let Ok(secs) = env::var("SLOT_FINDER_TIME_BUDGET_SECS") {
            self.search.time_budget_secs = secs.parse().map_err(|_| {
                SlotFinderError::Configuration(
                    "SLOT_FINDER_TIME_BUDGET_SECS must be a whole number of seconds".to_string(),
                )
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> SlotFinderResult<()> {
        if self.search.max_chain_depth == 0 || self.search.max_chain_depth > MAX_CHAIN_DEPTH {
            return Err(SlotFinderError::Configuration(format!(
                "search.max_chain_depth must be between 1 and {}, got {}",
                MAX_CHAIN_DEPTH, self.search.max_chain_depth
            )));
        }
        if self.search.max_results == 0 {
            return Err(SlotFinderError::Configuration(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        if self.search.time_budget_secs > MAX_TIME_BUDGET_SECS {
            return Err(SlotFinderError::Configuration(format!(
                "search.time_budget_secs must be at most {}, got {}",
                MAX_TIME_BUDGET_SECS, self.search.time_budget_secs
            )));
        }
        if self.search.displacement_penalty > 100 {
            return Err(SlotFinderError::Configuration(format!(
                "search.displacement_penalty must be at most 100, got {}",
                self.search.displacement_penalty
            )));
        }
        if let Some((name, value)) = self.weights.named().into_iter().find(|(_, w)| *w > MAX_WEIGHT) {
            return Err(SlotFinderError::Configuration(format!(
                "weights.{} must be at most {}, got {}",
                name, MAX_WEIGHT, value
            )));
        }
        if self.weights.max_total() == 0 {
            return Err(SlotFinderError::Configuration(
                "at least one scoring weight must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
