use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

#[derive(Debug, Clone)]
pub struct Config {
    pub channel_access_token: String,
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub users_file: PathBuf,
    pub line_api_base: String,
}

impl Config {
    /// Reads the process environment. Call `dotenv()` first so a local `.env`
    /// file is honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let channel_access_token = lookup("LINE_CHANNEL_ACCESS_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("LINE_CHANNEL_ACCESS_TOKEN"))?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_addr.clone(),
        })?;

        Ok(Self {
            channel_access_token,
            bind_addr,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            users_file: lookup("USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("users.json")),
            line_api_base: lookup("LINE_API_BASE")
                .unwrap_or_else(|| DEFAULT_LINE_API_BASE.to_string()),
        })
    }

    pub fn bible_text_path(&self) -> PathBuf {
        self.data_dir.join("bible_text.json")
    }

    pub fn bible_plans_path(&self) -> PathBuf {
        self.data_dir.join("bible_plans.json")
    }
}
