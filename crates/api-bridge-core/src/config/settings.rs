//! Configuration file loading and environment-variable overrides.
//!
//! A path-traversal guard, a file-size cap, and a "config file is optional,
//! fall back to defaults" posture, reading YAML and honoring the
//! `API_BRIDGE_CONFIG_PATH` env var for the file location.

use crate::models::settings::Settings;
use log::{debug, warn};
use std::path::Path;

const MAX_CONFIG_SIZE: u64 = 10 * 1024 * 1024;

/// Loads [`Settings`] from the YAML file named by `API_BRIDGE_CONFIG_PATH`
/// (default `./config.yaml`), then applies environment-variable overrides
/// for the handful of knobs operators tune per-deployment without editing
/// the file: `API_BRIDGE_PORT`, `API_BRIDGE_DATABASE_DSN`,
/// `API_BRIDGE_LOG_LEVEL`.
///
/// A missing config file is not an error: the process starts with
/// [`Settings::default`] and env overrides alone, the same way a freshly
/// checked-out deployment has no endpoints configured until the management
/// surface populates them.
pub fn load_settings() -> Result<Settings, Box<dyn std::error::Error>> {
    let config_path =
        std::env::var("API_BRIDGE_CONFIG_PATH").unwrap_or_else(|_| "./config.yaml".to_string());

    let path = Path::new(&config_path);
    let mut settings = if path.exists() {
        let canonical_path = path
            .canonicalize()
            .map_err(|e| format!("cannot resolve config path '{}': {}", config_path, e))?;
        let current_dir = std::env::current_dir()
            .map_err(|e| format!("cannot get current directory: {}", e))?;
        if !canonical_path.starts_with(&current_dir) {
            warn!("config path '{}' is outside working directory", config_path);
            return Err("config path outside working directory".into());
        }

        let metadata = std::fs::metadata(&canonical_path)
            .map_err(|e| format!("cannot read config file metadata: {}", e))?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(format!(
                "config file too large: {} bytes (max: {} bytes)",
                metadata.len(),
                MAX_CONFIG_SIZE
            )
            .into());
        }

        let raw = std::fs::read_to_string(&canonical_path)
            .map_err(|e| format!("cannot read config file: {}", e))?;
        let settings: Settings =
            serde_yaml::from_str(&raw).map_err(|e| format!("invalid yaml: {}", e))?;
        debug!(
            "loaded configuration from {} ({} endpoints)",
            config_path,
            settings.endpoints.len()
        );
        settings
    } else {
        debug!(
            "no config file at '{}', starting from defaults",
            config_path
        );
        Settings::default()
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(port) = std::env::var("API_BRIDGE_PORT") {
        match port.parse::<u16>() {
            Ok(p) => settings.port = p,
            Err(_) => warn!("ignoring invalid API_BRIDGE_PORT value: {}", port),
        }
    }
    if let Ok(dsn) = std::env::var("API_BRIDGE_DATABASE_DSN") {
        settings.database_dsn = Some(dsn);
    }
    if let Ok(level) = std::env::var("API_BRIDGE_LOG_LEVEL") {
        settings.logging.level = level;
    }
}
