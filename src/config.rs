use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEGATE_CONFIG_PATH").unwrap_or("/usr/local/etc/facegate/config.toml"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind: String,
    /// Acceptance threshold for cosine similarity between embeddings.
    pub threshold: f32,
    /// Minimum detector score for a detection to count as a face.
    pub detector_threshold: f32,
    /// Directory holding the durable identity store.
    pub data_dir: PathBuf,
    /// Seconds before a pending capture expires.
    pub capture_ttl_secs: u64,
    pub admin_username: String,
    pub admin_password: String,
    /// ONNX face detector model path.
    pub detector_model: PathBuf,
    /// ONNX face recognizer model path.
    pub recognizer_model: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            threshold: 0.6,
            detector_threshold: 0.6,
            data_dir: PathBuf::from("/var/lib/facegate"),
            capture_ttl_secs: 300,
            admin_username: "root".to_string(),
            admin_password: "ssh".to_string(),
            detector_model: PathBuf::from("/usr/local/share/facegate/face_detection.onnx"),
            recognizer_model: PathBuf::from("/usr/local/share/facegate/face_recognition.onnx"),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
