use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_JUDGMENT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_EXTRACTION_MODEL: &str = "openai/gpt-oss-20b";

/// Application configuration loaded from environment variables.
/// Only malformed values fail here; a missing LLM key surfaces at first use.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub gmail: GmailConfig,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

/// Settings for the chat-completions service.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub extraction_model: String,
}

/// Locations of the mailbox OAuth files.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub token_path: PathBuf,
    pub credentials_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            llm: LlmConfig {
                api_key: optional_env(&["LLM_API_KEY", "GROQ_API_KEY"]),
                base_url: optional_env(&["LLM_BASE_URL"])
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: optional_env(&["LLM_MODEL"])
                    .unwrap_or_else(|| DEFAULT_JUDGMENT_MODEL.to_string()),
                extraction_model: optional_env(&["LLM_EXTRACTION_MODEL"])
                    .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
            },
            gmail: GmailConfig {
                token_path: optional_env(&["GMAIL_TOKEN_PATH", "TOKEN_PATH"])
                    .unwrap_or_else(|| "token.json".to_string())
                    .into(),
                credentials_path: optional_env(&["GMAIL_CREDENTIALS_PATH", "CREDENTIALS_PATH"])
                    .unwrap_or_else(|| "credentials.json".to_string())
                    .into(),
            },
            database_url: optional_env(&["DATABASE_URL"])
                .unwrap_or_else(|| "sqlite://rh_jobs.db".to_string()),
            data_dir: optional_env(&["SKILLFIT_DATA_DIR"])
                .unwrap_or_else(|| "data".to_string())
                .into(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn offers_dir(&self) -> PathBuf {
        self.data_dir.join("offers")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }
}

/// First non-empty value among `keys`, in order.
fn optional_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
