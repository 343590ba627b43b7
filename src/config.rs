use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ai::Mode;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub llm_provider: LLMProvider,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_endpoint: String,
    /// Full deployment URL, e.g. `.../openai/deployments/gpt-4o/chat/completions?api-version=...`
    pub azure_endpoint: String,
    pub azure_api_key: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub request_timeout_secs: u64,
    pub default_mode: Mode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LLMProvider {
    OpenAI,
    AzureOpenAI,
    Ollama,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_provider: LLMProvider::OpenAI,
            openai_api_key: String::new(),
            openai_model: "gpt-4o".to_string(),
            openai_endpoint: OPENAI_CHAT_URL.to_string(),
            azure_endpoint: String::new(),
            azure_api_key: String::new(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2-vision".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            top_p: 0.95,
            request_timeout_secs: 120,
            default_mode: Mode::Expense,
        }
    }
}

impl AppConfig {
    /// `<config dir>/summa`, or the working directory when the platform has none.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("summa"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn load(config_dir: &Path) -> Self {
        let mut config = Self::load_file(config_dir);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_file(config_dir: &Path) -> Self {
        let config_path = config_dir.join("config.json");
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("Ignoring malformed {}: {}", config_path.display(), e);
                    Self::default()
                }),
                Err(e) => {
                    log::warn!("Failed to read {}: {}", config_path.display(), e);
                    Self::default()
                }
            }
        } else {
            let c = Self::default();
            c.save(config_dir);
            c
        }
    }

    /// Environment wins over the file so keys never have to be written to disk.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.openai_api_key = key;
        }

        if let Some(endpoint) = var("GPT4O_ENDPOINT") {
            self.azure_endpoint = endpoint;
            self.llm_provider = LLMProvider::AzureOpenAI;
        }
        if let Some(key) = var("GPT4O_API_KEY") {
            self.azure_api_key = key;
        }
    }

    pub fn save(&self, config_dir: &Path) {
        if let Err(e) = std::fs::create_dir_all(config_dir) {
            log::warn!("Cannot create {}: {}", config_dir.display(), e);
            return;
        }
        let config_path = config_dir.join("config.json");
        if let Ok(content) = serde_json::to_string_pretty(self) {
            if let Err(e) = std::fs::write(&config_path, content) {
                log::warn!("Failed to write {}: {}", config_path.display(), e);
            }
        }
    }
}
