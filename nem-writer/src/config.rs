use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::error::{NemError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantsConfig {
    pub to: String,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.csv")
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriterConfig {
    pub participants: ParticipantsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl WriterConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("NEM_WRITER_CONFIG").unwrap_or_else(|_| "nem-writer.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg = Self::from_toml_str(&contents)?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: WriterConfig =
            toml::from_str(contents).map_err(|e| NemError::Configuration(format!("invalid config: {e}")))?;
        if cfg.participants.to.trim().is_empty() {
            return Err(NemError::Configuration("participants.to is required".to_string()));
        }
        Ok(cfg)
    }
}
