/// Configuration for the flowboard client.
/// Reads client.json from ~/.config/flowboard/client.json (or platform
/// equivalent).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_board_id")]
    pub board_id: i64,
    /// Per-request timeout in seconds; `None` lets requests run until
    /// the transport gives up.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_board_id() -> i64 {
    1
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            board_id: default_board_id(),
            request_timeout_secs: None,
        }
    }
}

/// Default config path: ~/.config/flowboard/client.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flowboard")
        .join("client.json")
}

/// Load config from path. Returns default if file doesn't exist.
pub fn load_config(path: &PathBuf) -> ClientConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse config {}: {}", path.display(), e);
            ClientConfig::default()
        }),
        Err(_) => {
            log::info!("No config at {}, using defaults", path.display());
            ClientConfig::default()
        }
    }
}
