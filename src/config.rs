use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::local_store::default_data_dir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub mock_mode: bool,
    pub classroom_api_url: String,
    pub calendar_api_url: String,
    pub data_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub delivery_latency_ms: u64,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            mock_mode: false,
            classroom_api_url: "https://classroom.googleapis.com/v1/".into(),
            calendar_api_url: "https://www.googleapis.com/calendar/v3/".into(),
            data_dir: default_data_dir().unwrap_or_else(|| PathBuf::from(".semillero")),
            database_url: None,
            delivery_latency_ms: 300,
            log_json: false,
        }
    }
}

impl Config {
    /// Config file first (if any), then environment overrides on top.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config at {}", path.display()))?;
                toml::from_str::<Config>(&contents).with_context(|| "Failed to parse config.toml")?
            }
            _ => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("SEMILLERO_BIND") {
            self.bind_addr = v;
        }
        if let Some(v) = var("SEMILLERO_MOCK") {
            self.mock_mode = parse_bool(&v);
        }
        if let Some(v) = var("CLASSROOM_API_URL") {
            self.classroom_api_url = v;
        }
        if let Some(v) = var("CALENDAR_API_URL") {
            self.calendar_api_url = v;
        }
        if let Some(v) = var("SEMILLERO_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database_url = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Some(v) = var("SEMILLERO_DELIVERY_LATENCY_MS") {
            self.delivery_latency_ms = v
                .trim()
                .parse()
                .with_context(|| format!("SEMILLERO_DELIVERY_LATENCY_MS is not a number: {v}"))?;
        }
        if let Some(v) = var("SEMILLERO_LOG_JSON") {
            self.log_json = parse_bool(&v);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.classroom_api_url)
            .with_context(|| format!("Invalid classroom_api_url: {}", self.classroom_api_url))?;
        Url::parse(&self.calendar_api_url)
            .with_context(|| format!("Invalid calendar_api_url: {}", self.calendar_api_url))?;
        Ok(())
    }

    pub fn generate_default() -> Result<PathBuf> {
        let path = Self::config_path()
            .with_context(|| "Could not determine config directory")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(&Config::default())?;
        std::fs::write(&path, toml_str)?;
        Ok(path)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("semillero").join("config.toml"))
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
