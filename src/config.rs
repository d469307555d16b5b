//! Service configuration.
//!
//! Loaded from `configs/plan_master.json` (or the file named by
//! `PLAN_MASTER_CONFIG`) when present; defaults otherwise. `PLAN_MASTER_BIND`
//! overrides the listen address.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "configs/plan_master.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Only worksheets whose name starts with this prefix are imported.
    #[serde(default = "default_sheet_prefix")]
    pub sheet_prefix: String,
    /// Sheets counted as teaching work in the summary unless toggled off.
    #[serde(default = "default_teaching_sheets")]
    pub teaching_sheets: Vec<String>,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_sheet_prefix() -> String {
    "Table".to_string()
}

fn default_teaching_sheets() -> Vec<String> {
    vec!["Table 2".to_string(), "Table 3".to_string()]
}

fn default_max_upload_mb() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            sheet_prefix: default_sheet_prefix(),
            teaching_sheets: default_teaching_sheets(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl AppConfig {
    /// Load from the configured file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PLAN_MASTER_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            Self::load_from_file(Path::new(&path))?
        } else {
            info!("No config at {}, using defaults", path);
            Self::default()
        };

        if let Ok(bind) = std::env::var("PLAN_MASTER_BIND") {
            config.bind_addr = bind;
        }

        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Whether a sheet counts as teaching work by default (case-insensitive).
    pub fn is_teaching_sheet(&self, sheet_name: &str) -> bool {
        self.teaching_sheets
            .iter()
            .any(|s| crate::labels::eq_ignore_case(sheet_name, s))
    }
}
