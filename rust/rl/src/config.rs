use anyhow::{Context, Result};
use epigym::common::defs::Continous;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Settings for a sampling run. Every field has a default, so a config file only lists overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Base URL of the gymnasium HTTP server hosting the simulator.
    pub api_url: String,
    pub env_id: String,
    pub max_episode_length: usize,
    pub episodes: usize,
    /// Seed for the first reset of each policy's run.
    pub seed: Option<u64>,
    /// Level applied to every control by the constant-treatment policy.
    pub treatment_level: Continous,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000".to_string(),
            env_id: "Zika-v0".to_string(),
            max_episode_length: 400,
            episodes: 1,
            seed: Some(2718),
            treatment_level: 0.5,
            output_dir: PathBuf::from("rollouts"),
            format: OutputFormat::Json,
        }
    }
}

impl RolloutConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
