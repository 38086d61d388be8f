// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when an existing structure does not match its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    Ask,
    Always,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub schema: Option<PathBuf>,
    pub pointer_size: u64,
    pub overwrite: OverwritePolicy,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("types.json"),
            schema: None,
            pointer_size: 8,
            overwrite: OverwritePolicy::Ask,
            log_level: "info".to_string(),
            log_file: None,
            color: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate().map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn with_database(mut self, database: PathBuf) -> Self {
        self.database = database;
        self
    }

    pub fn with_schema(mut self, schema: PathBuf) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_pointer_size(mut self, pointer_size: u64) -> Self {
        self.pointer_size = pointer_size;
        self
    }

    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pointer_size != 4 && self.pointer_size != 8 {
            return Err(format!("pointer_size must be 4 or 8, got {}", self.pointer_size));
        }
        if self.database.as_os_str().is_empty() {
            return Err("database path must not be empty".to_string());
        }
        Ok(())
    }
}
