use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable overriding the external API key.
pub const API_KEY_ENV: &str = "DOCENT_API_KEY";
/// Environment variable overriding the model API key.
pub const MODEL_KEY_ENV: &str = "DOCENT_MODEL_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub api: ApiConfig,
    pub model: ModelConfig,
    pub retrieval: RetrievalConfig,

    #[serde(skip)]
    pub config_path: PathBuf,
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            api: ApiConfig::default(),
            model: ModelConfig::default(),
            retrieval: RetrievalConfig::default(),
            config_path: PathBuf::new(),
            data_dir: PathBuf::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("could not find home directory")?;
        let docent_dir = home.join(".docent");
        let config_path = docent_dir.join("config.toml");

        if !docent_dir.exists() {
            fs::create_dir_all(&docent_dir).context("failed to create .docent directory")?;
        }

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("failed to read config file")?;
            toml::from_str::<Config>(&contents).context("failed to parse config file")?
        } else {
            let config = Config::default();
            fs::write(
                &config_path,
                toml::to_string_pretty(&config).context("failed to serialize config")?,
            )
            .context("failed to write default config")?;
            config
        };

        config.config_path = config_path;
        config.data_dir = docent_dir;
        config.apply_overrides(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(MODEL_KEY_ENV).ok(),
        );
        Ok(config)
    }

    /// Environment variables take priority over the config file.
    fn apply_overrides(&mut self, api_key: Option<String>, model_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api.api_key = Some(key);
        }
        if let Some(key) = model_key.filter(|k| !k.trim().is_empty()) {
            self.model.api_key = Some(key);
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("conversations.db")
    }
}
